use std::collections::BTreeMap;

use sgdns_config::{DnsProviderKind, HealthCheckConfig, ProceedMode, ReadinessConfig};
use sgdns_domain::{HealthCheckResult, ReadinessResult};

use crate::context::InstanceLifecycleContext;

/// One batch of deduplicated probe work: a probe configuration, the instance
/// to probe, and every context waiting on the outcome.
#[derive(Debug, Clone)]
pub struct ProbeGroup<C> {
    pub key: String,
    pub instance_id: String,
    pub config: C,
    pub member_indices: Vec<usize>,
}

/// Aggregates the per-configuration instance contexts of one invocation and
/// answers the grouped views the probe and plan stages need.
///
/// A scaling group may have several configurations with different probe
/// definitions; the same instance can pass readiness for one and fail it for
/// another. Contexts are therefore tracked per configuration, and probe work
/// is deduplicated across contexts sharing a probe definition.
#[derive(Debug, Default)]
pub struct InstanceContextManager {
    contexts: Vec<InstanceLifecycleContext>,
}

impl InstanceContextManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a context. A probe that is absent or disabled is
    /// pre-populated with a synthetic pass so the operational derivation
    /// only ever looks at results.
    pub fn register(&mut self, mut context: InstanceLifecycleContext) {
        if !context.readiness_check_required() {
            let hash = context
                .readiness_config
                .as_ref()
                .map(ReadinessConfig::hash)
                .unwrap_or_default();
            context.readiness_result = Some(ReadinessResult::passed(&context.instance_id, hash));
        }
        if !context.health_check_required() {
            let hash = context
                .health_check_config
                .as_ref()
                .map(HealthCheckConfig::hash)
                .unwrap_or_default();
            context.health_check_result =
                Some(HealthCheckResult::passed(&context.instance_id, hash));
        }
        self.contexts.push(context);
    }

    pub fn contexts(&self) -> &[InstanceLifecycleContext] {
        &self.contexts
    }

    pub fn contexts_mut(&mut self) -> &mut [InstanceLifecycleContext] {
        &mut self.contexts
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    // ── Probe groupings ──────────────────────────────────────────────────────

    /// Readiness configurations still needing a probe, deduplicated by
    /// (instance, configuration hash).
    pub fn readiness_groups(&self) -> Vec<ProbeGroup<ReadinessConfig>> {
        let mut groups: BTreeMap<String, ProbeGroup<ReadinessConfig>> = BTreeMap::new();
        for (index, context) in self.contexts.iter().enumerate() {
            if !context.readiness_check_required() || context.readiness_result.is_some() {
                continue;
            }
            let (Some(key), Some(config)) =
                (context.readiness_group_key(), context.readiness_config.clone())
            else {
                continue;
            };
            groups
                .entry(key.clone())
                .or_insert_with(|| ProbeGroup {
                    key,
                    instance_id: context.instance_id.clone(),
                    config,
                    member_indices: Vec::new(),
                })
                .member_indices
                .push(index);
        }
        groups.into_values().collect()
    }

    /// Health configurations still needing a probe, restricted to contexts
    /// whose readiness already passed.
    pub fn health_groups(&self) -> Vec<ProbeGroup<HealthCheckConfig>> {
        let mut groups: BTreeMap<String, ProbeGroup<HealthCheckConfig>> = BTreeMap::new();
        for (index, context) in self.contexts.iter().enumerate() {
            if !context.readiness_passed()
                || !context.health_check_required()
                || context.health_check_result.is_some()
            {
                continue;
            }
            let (Some(key), Some(config)) =
                (context.health_group_key(), context.health_check_config.clone())
            else {
                continue;
            };
            groups
                .entry(key.clone())
                .or_insert_with(|| ProbeGroup {
                    key,
                    instance_id: context.instance_id.clone(),
                    config,
                    member_indices: Vec::new(),
                })
                .member_indices
                .push(index);
        }
        groups.into_values().collect()
    }

    /// Fan a completed readiness probe back to every context in its group.
    pub fn apply_readiness_result(&mut self, group: &ProbeGroup<ReadinessConfig>, result: &ReadinessResult) {
        for &index in &group.member_indices {
            if let Some(context) = self.contexts.get_mut(index) {
                context.readiness_result = Some(result.clone());
            }
        }
    }

    pub fn apply_health_result(&mut self, group: &ProbeGroup<HealthCheckConfig>, result: &HealthCheckResult) {
        for &index in &group.member_indices {
            if let Some(context) = self.contexts.get_mut(index) {
                context.health_check_result = Some(result.clone());
            }
        }
    }

    /// Synthetically pass every pending readiness probe. Used when a stage
    /// skips probing entirely (a draining instance leaves the record set no
    /// matter what its probes would say).
    pub fn pass_pending_readiness(&mut self) {
        for context in &mut self.contexts {
            if context.readiness_result.is_none() {
                let hash = context
                    .readiness_config
                    .as_ref()
                    .map(ReadinessConfig::hash)
                    .unwrap_or_default();
                context.readiness_result =
                    Some(ReadinessResult::passed(&context.instance_id, hash));
            }
        }
    }

    pub fn pass_pending_health(&mut self) {
        for context in &mut self.contexts {
            if context.health_check_result.is_none() {
                let hash = context
                    .health_check_config
                    .as_ref()
                    .map(HealthCheckConfig::hash)
                    .unwrap_or_default();
                context.health_check_result =
                    Some(HealthCheckResult::passed(&context.instance_id, hash));
            }
        }
    }

    // ── Provider and operational views ───────────────────────────────────────

    /// Distinct DNS providers across all tracked configurations.
    pub fn dns_providers(&self) -> Vec<DnsProviderKind> {
        let mut kinds: Vec<DnsProviderKind> = Vec::new();
        for context in &self.contexts {
            let kind = context.sg_config.dns_config.provider;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }

    pub fn all_operational(&self) -> bool {
        self.contexts
            .iter()
            .all(|c| c.instance.is_some() && c.operational())
    }

    fn operational_count(&self) -> usize {
        self.contexts.iter().filter(|c| c.operational()).count()
    }

    /// Whether this context's DNS change may proceed under its proceed mode.
    fn proceeds(&self, context: &InstanceLifecycleContext) -> bool {
        match context.sg_config.proceed_mode {
            ProceedMode::SelfOperational => context.operational(),
            ProceedMode::AllOperational => self.all_operational(),
            // At least half the siblings, rounded up, and the context itself.
            ProceedMode::HalfOperational => {
                context.operational() && 2 * self.operational_count() >= self.contexts.len()
            }
        }
    }

    /// Indices of contexts whose changes may be planned and applied.
    pub fn operational_context_indices(&self) -> Vec<usize> {
        self.contexts
            .iter()
            .enumerate()
            .filter(|(_, c)| self.proceeds(c))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn non_operational_context_indices(&self) -> Vec<usize> {
        self.contexts
            .iter()
            .enumerate()
            .filter(|(_, c)| !self.proceeds(c))
            .map(|(i, _)| i)
            .collect()
    }
}
