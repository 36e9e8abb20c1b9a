use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use sgdns_config::{EnvironmentConfig, SgConfigService};
use sgdns_dns::{ChangePlanner, ProviderRegistry};
use sgdns_domain::{LifecycleEvent, LifecycleTransition};
use sgdns_probe::{HealthCheck, InstanceDiscovery, ReadinessProbe};
use sgdns_store::{sg_lock_key, LockStore};

use crate::context::SglContext;
use crate::error::PipelineError;
use crate::metrics::MetricsSink;
use crate::outcome::LifecycleOutcome;
use crate::scheduler::SchedulerPool;
use crate::steps::{
    ApplyDnsChangesStep, HealthChecksStep, InitStep, LoadMetadataStep, PipelineStep,
    PlanDnsChangesStep, ReadinessChecksStep,
};

/// The scaling-group lifecycle pipeline: an ordered step chain sharing one
/// context per invocation.
///
/// Probe stages run before the lock is taken — they are read-only and may
/// poll for minutes. Everything from metadata loading onwards runs under the
/// per-scaling-group lock, so concurrent invocations serialize their record
/// mutations. The lock is released on every exit path.
pub struct LifecyclePipeline {
    lock: Arc<dyn LockStore>,
    metrics: Arc<dyn MetricsSink>,
    pre_lock_steps: Vec<Box<dyn PipelineStep>>,
    locked_steps: Vec<Box<dyn PipelineStep>>,
}

impl LifecyclePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config_service: Arc<SgConfigService>,
        discovery: Arc<dyn InstanceDiscovery>,
        readiness_probe: Arc<dyn ReadinessProbe>,
        health_check: Arc<dyn HealthCheck>,
        planner: Arc<ChangePlanner>,
        registry: Arc<ProviderRegistry>,
        lock: Arc<dyn LockStore>,
        metrics: Arc<dyn MetricsSink>,
        env: &EnvironmentConfig,
    ) -> Self {
        let pool = SchedulerPool::new(env.thread_pool_size);
        let pre_lock_steps: Vec<Box<dyn PipelineStep>> = vec![
            Box::new(InitStep::new(
                config_service,
                discovery.clone(),
                env.readiness_defaults.clone(),
                env.reconciliation.clone(),
            )),
            Box::new(ReadinessChecksStep::new(readiness_probe, pool.clone())),
            Box::new(HealthChecksStep::new(health_check, discovery.clone(), pool)),
        ];
        let locked_steps: Vec<Box<dyn PipelineStep>> = vec![
            Box::new(LoadMetadataStep::new(discovery)),
            Box::new(PlanDnsChangesStep::new(planner)),
            Box::new(ApplyDnsChangesStep::new(registry, metrics.clone())),
        ];
        LifecyclePipeline { lock, metrics, pre_lock_steps, locked_steps }
    }

    /// Run the pipeline for one event and fold the result into the
    /// caller-visible outcome envelope.
    pub async fn handle(&self, event: LifecycleEvent) -> LifecycleOutcome {
        let scaling_group = event.scaling_group_name.clone();
        let started = Instant::now();
        let result = self.run(event).await;
        self.metrics.record_dimension("scaling_group", &scaling_group);
        self.metrics.record_point(
            "pipeline_duration_ms",
            started.elapsed().as_millis() as f64,
            "Milliseconds",
        );
        self.metrics.publish().await;

        match result {
            Ok(Some(ctx)) => {
                let applied: Vec<String> = ctx
                    .applied_changes
                    .iter()
                    .filter(|a| a.success)
                    .map(|a| a.change.clone())
                    .collect();
                let mut outcome = LifecycleOutcome::handled(format!(
                    "handled {} event for scaling group '{}': {} change(s) applied",
                    ctx.event.transition,
                    scaling_group,
                    applied.len()
                ));
                outcome.changes = applied;
                outcome.plan_errors = ctx.plan_errors;
                outcome
            }
            Ok(None) => LifecycleOutcome::handled("ignored unrelated lifecycle event"),
            Err(e) => {
                warn!(scaling_group = %scaling_group, error = %e, "pipeline failed");
                LifecycleOutcome::failed(e.to_string())
            }
        }
    }

    async fn run(&self, event: LifecycleEvent) -> Result<Option<SglContext>, PipelineError> {
        event.validate()?;
        if event.transition == LifecycleTransition::Unrelated {
            debug!("unrelated event; nothing to do");
            return Ok(None);
        }

        info!(event = %event, "starting lifecycle pipeline");
        let mut ctx = SglContext::new(event);
        for step in &self.pre_lock_steps {
            debug!(step = step.name(), "running step");
            step.run(&mut ctx).await?;
        }

        // Record mutations for one scaling group are mutually exclusive
        // across invocations.
        let lock_key = sg_lock_key(&ctx.event.scaling_group_name);
        if !self.lock.acquire(&lock_key).await? {
            return Err(PipelineError::LockUnavailable(
                ctx.event.scaling_group_name.clone(),
            ));
        }

        let mut outcome = Ok(());
        for step in &self.locked_steps {
            debug!(step = step.name(), "running step");
            if let Err(e) = step.run(&mut ctx).await {
                outcome = Err(e);
                break;
            }
        }
        if let Err(e) = self.lock.release(&lock_key).await {
            warn!(key = %lock_key, error = %e, "lock release failed");
        }
        outcome?;
        Ok(Some(ctx))
    }
}
