use uuid::Uuid;

use sgdns_config::{HealthCheckConfig, ReadinessConfig, ScalingGroupConfig};
use sgdns_dns::DnsChangeRequest;
use sgdns_domain::{HealthCheckResult, Instance, LifecycleEvent, ReadinessResult};

use crate::manager::InstanceContextManager;

/// The lifecycle of one instance under one scaling-group configuration.
///
/// The same instance appears in one context per configuration tracking its
/// group; each context carries the probe configurations that apply to it and
/// accumulates the probe results as stages complete.
#[derive(Debug, Clone)]
pub struct InstanceLifecycleContext {
    pub instance_id: String,
    pub sg_config: ScalingGroupConfig,
    /// Effective readiness configuration: the item's own, or the
    /// environment-wide default when the item declares none.
    pub readiness_config: Option<ReadinessConfig>,
    pub health_check_config: Option<HealthCheckConfig>,
    pub instance: Option<Instance>,
    pub readiness_result: Option<ReadinessResult>,
    pub health_check_result: Option<HealthCheckResult>,
}

impl InstanceLifecycleContext {
    pub fn new(
        instance_id: impl Into<String>,
        sg_config: ScalingGroupConfig,
        readiness_config: Option<ReadinessConfig>,
        health_check_config: Option<HealthCheckConfig>,
    ) -> Self {
        InstanceLifecycleContext {
            instance_id: instance_id.into(),
            sg_config,
            readiness_config,
            health_check_config,
            instance: None,
            readiness_result: None,
            health_check_result: None,
        }
    }

    pub fn readiness_check_required(&self) -> bool {
        self.readiness_config.as_ref().map(|c| c.enabled).unwrap_or(false)
    }

    pub fn health_check_required(&self) -> bool {
        self.health_check_config.as_ref().map(|c| c.enabled).unwrap_or(false)
    }

    pub fn readiness_passed(&self) -> bool {
        self.readiness_result.as_ref().map(|r| r.ready).unwrap_or(false)
    }

    pub fn health_passed(&self) -> bool {
        self.health_check_result.as_ref().map(|r| r.healthy).unwrap_or(false)
    }

    /// An instance is operational for this configuration when both gates
    /// pass (synthetically pre-passed when a gate is absent or disabled).
    pub fn operational(&self) -> bool {
        self.readiness_passed() && self.health_passed()
    }

    /// Probe work is deduplicated per (instance, probe configuration): two
    /// configurations sharing a probe definition for the same instance run
    /// it once and share the result.
    pub fn readiness_group_key(&self) -> Option<String> {
        self.readiness_config
            .as_ref()
            .map(|c| format!("{}:{}", self.instance_id, c.hash()))
    }

    pub fn health_group_key(&self) -> Option<String> {
        self.health_check_config
            .as_ref()
            .map(|c| format!("{}:{}", self.instance_id, c.hash()))
    }
}

impl std::fmt::Display for InstanceLifecycleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.instance_id, self.sg_config)
    }
}

/// A planned record mutation, with a back-reference to the context it was
/// planned for.
#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub context_index: usize,
    pub request: DnsChangeRequest,
}

/// Everything applied, as observed by the apply stage.
#[derive(Debug, Clone)]
pub struct AppliedChange {
    pub change: String,
    pub success: bool,
}

/// Mutable state threaded through the pipeline stages for one invocation.
/// Created at event arrival, owned by the invocation, discarded afterwards.
#[derive(Debug)]
pub struct SglContext {
    pub context_id: Uuid,
    pub event: LifecycleEvent,
    pub sg_configs: Vec<ScalingGroupConfig>,
    pub manager: InstanceContextManager,
    pub planned_changes: Vec<PlannedChange>,
    pub applied_changes: Vec<AppliedChange>,
    /// Per-context planning failures. These do not abort the invocation;
    /// sibling contexts proceed.
    pub plan_errors: Vec<String>,
}

impl SglContext {
    pub fn new(event: LifecycleEvent) -> Self {
        SglContext {
            context_id: Uuid::new_v4(),
            event,
            sg_configs: Vec::new(),
            manager: InstanceContextManager::new(),
            planned_changes: Vec::new(),
            applied_changes: Vec::new(),
            plan_errors: Vec::new(),
        }
    }
}
