use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use sgdns_domain::{LifecycleTransition, ReadinessResult};
use sgdns_probe::{ProbeError, ReadinessProbe};

use crate::context::SglContext;
use crate::error::PipelineError;
use crate::scheduler::SchedulerPool;
use crate::steps::PipelineStep;

/// Fans readiness probes out across the distinct readiness configurations
/// still needing a check, then folds completed results back into every
/// context sharing the probe definition.
pub struct ReadinessChecksStep {
    probe: Arc<dyn ReadinessProbe>,
    pool: SchedulerPool,
}

impl ReadinessChecksStep {
    pub fn new(probe: Arc<dyn ReadinessProbe>, pool: SchedulerPool) -> Self {
        ReadinessChecksStep { probe, pool }
    }
}

#[async_trait]
impl PipelineStep for ReadinessChecksStep {
    fn name(&self) -> &'static str {
        "readiness_checks"
    }

    async fn run(&self, ctx: &mut SglContext) -> Result<(), PipelineError> {
        if ctx.event.transition == LifecycleTransition::Draining {
            // A draining instance leaves the record set regardless of
            // readiness.
            ctx.manager.pass_pending_readiness();
            return Ok(());
        }

        let groups = ctx.manager.readiness_groups();
        if groups.is_empty() {
            return Ok(());
        }
        debug!(count = groups.len(), "dispatching readiness checks");

        let mut scheduler = self
            .pool
            .scheduler::<(String, Result<ReadinessResult, ProbeError>)>();
        for group in &groups {
            let probe = self.probe.clone();
            let key = group.key.clone();
            let instance_id = group.instance_id.clone();
            let config = group.config.clone();
            scheduler
                .place(async move { (key, probe.is_ready(&instance_id, &config).await) })
                .await?;
        }

        while let Some((key, result)) = scheduler.retrieve_next().await {
            let Some(group) = groups.iter().find(|g| g.key == key) else { continue };
            match result {
                Ok(result) => {
                    debug!(
                        instance_id = %result.instance_id,
                        ready = result.ready,
                        time_taken_ms = result.time_taken_ms,
                        "readiness check completed"
                    );
                    ctx.manager.apply_readiness_result(group, &result);
                }
                Err(e) => {
                    // Contexts keep no result and stay non-operational.
                    error!(key = %key, error = %e, "readiness check failed");
                    ctx.plan_errors
                        .push(format!("readiness check {}: {}", key, e));
                }
            }
        }
        Ok(())
    }
}
