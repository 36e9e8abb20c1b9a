use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use sgdns_domain::{HealthCheckResult, Instance, LifecycleTransition};
use sgdns_probe::{HealthCheck, InstanceDiscovery};

use crate::context::SglContext;
use crate::error::PipelineError;
use crate::scheduler::SchedulerPool;
use crate::steps::PipelineStep;

/// Probes instance health for every readiness-passed context that tracks a
/// health configuration. Endpoints are resolved from freshly discovered
/// instance metadata; probes run concurrently and results fan back by probe
/// group.
pub struct HealthChecksStep {
    health: Arc<dyn HealthCheck>,
    discovery: Arc<dyn InstanceDiscovery>,
    pool: SchedulerPool,
}

impl HealthChecksStep {
    pub fn new(
        health: Arc<dyn HealthCheck>,
        discovery: Arc<dyn InstanceDiscovery>,
        pool: SchedulerPool,
    ) -> Self {
        HealthChecksStep { health, discovery, pool }
    }
}

#[async_trait]
impl PipelineStep for HealthChecksStep {
    fn name(&self) -> &'static str {
        "health_checks"
    }

    async fn run(&self, ctx: &mut SglContext) -> Result<(), PipelineError> {
        if ctx.event.transition == LifecycleTransition::Draining {
            ctx.manager.pass_pending_health();
            return Ok(());
        }

        let groups = ctx.manager.health_groups();
        if groups.is_empty() {
            return Ok(());
        }

        // One discovery round for every instance with a pending probe; the
        // loaded models also seed the contexts for later stages.
        let mut ids: Vec<String> = groups.iter().map(|g| g.instance_id.clone()).collect();
        ids.sort();
        ids.dedup();
        let instances: HashMap<String, Instance> = self
            .discovery
            .describe_instances(&ids)
            .await?
            .into_iter()
            .map(|i| (i.instance_id.clone(), i))
            .collect();
        for context in ctx.manager.contexts_mut() {
            if context.instance.is_none() {
                context.instance = instances.get(&context.instance_id).cloned();
            }
        }

        debug!(count = groups.len(), "dispatching health checks");
        let mut scheduler = self.pool.scheduler::<(String, HealthCheckResult)>();
        let mut dispatched = 0usize;
        for group in &groups {
            let Some(instance) = instances.get(&group.instance_id) else {
                error!(instance_id = %group.instance_id, "instance not described; health check skipped");
                ctx.plan_errors.push(format!(
                    "health check {}: instance {} could not be described",
                    group.key, group.instance_id
                ));
                continue;
            };
            // Resolve the endpoint address before dispatch; an unresolvable
            // source fails only the owning contexts.
            let endpoint = match resolve_endpoint(&group.config.endpoint_source, instance) {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    error!(key = %group.key, error = %e, "endpoint resolution failed");
                    ctx.plan_errors.push(format!("health check {}: {}", group.key, e));
                    continue;
                }
            };

            let health = self.health.clone();
            let key = group.key.clone();
            let instance_id = group.instance_id.clone();
            let config = group.config.clone();
            scheduler
                .place(async move {
                    let mut result = health.check(&endpoint, &config).await;
                    result.instance_id = instance_id;
                    (key, result)
                })
                .await?;
            dispatched += 1;
        }
        debug!(dispatched, "health checks in flight");

        while let Some((key, result)) = scheduler.retrieve_next().await {
            debug!(%result, "health check completed");
            if let Some(group) = groups.iter().find(|g| g.key == key) {
                ctx.manager.apply_health_result(group, &result);
            }
        }
        Ok(())
    }
}

fn resolve_endpoint(source: &str, instance: &Instance) -> Result<String, sgdns_domain::DomainError> {
    let source = sgdns_domain::ValueSource::parse(source)?;
    Ok(source.resolve(instance)?.value)
}
