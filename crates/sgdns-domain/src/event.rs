use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

// ── Lifecycle transitions ─────────────────────────────────────────────────────

/// What is happening to an instance relative to its scaling group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleTransition {
    /// Instance is joining the fleet (launch hook, warm-pool promotion).
    Launching,
    /// Instance is leaving the fleet (termination hook, warm-pool demotion).
    Draining,
    /// Periodic audit pass, triggered outside of lifecycle hooks.
    Reconciling,
    /// Event the reconciler does not act on; kept for observability.
    Unrelated,
}

impl std::fmt::Display for LifecycleTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleTransition::Launching => "LAUNCHING",
            LifecycleTransition::Draining => "DRAINING",
            LifecycleTransition::Reconciling => "RECONCILING",
            LifecycleTransition::Unrelated => "UNRELATED",
        };
        write!(f, "{}", s)
    }
}

// ── LifecycleEvent ────────────────────────────────────────────────────────────

/// A single lifecycle notification, already decoded from whatever envelope the
/// cloud vendor delivered it in. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub transition: LifecycleTransition,
    #[serde(default)]
    pub scaling_group_name: String,
    #[serde(default)]
    pub instance_id: String,
    /// Opaque token used to acknowledge the hook at the source; never parsed.
    #[serde(default)]
    pub hook_token: String,
    /// Vendor-specific fields carried along for logging and acknowledgement.
    #[serde(default)]
    pub source_specific: BTreeMap<String, String>,
}

impl LifecycleEvent {
    pub fn new(
        transition: LifecycleTransition,
        scaling_group_name: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let event = LifecycleEvent {
            transition,
            scaling_group_name: scaling_group_name.into(),
            instance_id: instance_id.into(),
            hook_token: String::new(),
            source_specific: BTreeMap::new(),
        };
        event.validate()?;
        Ok(event)
    }

    pub fn with_hook_token(mut self, token: impl Into<String>) -> Self {
        self.hook_token = token.into();
        self
    }

    /// Launching and draining events are always tied to a concrete instance in
    /// a concrete scaling group; a reconciling event only needs the group.
    pub fn validate(&self) -> Result<(), DomainError> {
        match self.transition {
            LifecycleTransition::Launching | LifecycleTransition::Draining => {
                if self.scaling_group_name.is_empty() {
                    return Err(DomainError::InvalidEvent(format!(
                        "scaling group name is required for {} transition",
                        self.transition
                    )));
                }
                if self.instance_id.is_empty() {
                    return Err(DomainError::InvalidEvent(format!(
                        "instance id is required for {} transition",
                        self.transition
                    )));
                }
            }
            LifecycleTransition::Reconciling => {
                if self.scaling_group_name.is_empty() {
                    return Err(DomainError::InvalidEvent(
                        "scaling group name is required for RECONCILING transition".to_string(),
                    ));
                }
            }
            LifecycleTransition::Unrelated => {}
        }
        Ok(())
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.transition, self.scaling_group_name, self.instance_id
        )
    }
}
