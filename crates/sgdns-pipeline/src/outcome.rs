use serde::{Deserialize, Serialize};

/// Caller-visible result envelope for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleOutcome {
    /// HTTP-style status: 200 when the event was handled, 500 on a fatal
    /// stage error.
    pub status: u16,
    pub handled: bool,
    pub message: String,
    /// Canonical forms of the non-ignored changes this invocation applied.
    #[serde(default)]
    pub changes: Vec<String>,
    /// Per-context planning failures that did not abort the invocation.
    #[serde(default)]
    pub plan_errors: Vec<String>,
}

impl LifecycleOutcome {
    pub fn handled(message: impl Into<String>) -> Self {
        LifecycleOutcome {
            status: 200,
            handled: true,
            message: message.into(),
            changes: Vec::new(),
            plan_errors: Vec::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        LifecycleOutcome {
            status: 500,
            handled: false,
            message: message.into(),
            changes: Vec::new(),
            plan_errors: Vec::new(),
        }
    }
}
