use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use sgdns_domain::{Instance, LifecycleTransition};
use sgdns_probe::InstanceDiscovery;

use crate::context::SglContext;
use crate::error::PipelineError;
use crate::steps::PipelineStep;

/// Discovers the instances this invocation concerns and attaches their
/// models to every context. For hook-driven events the event's instance must
/// be describable; without its metadata there is no value to plan with.
pub struct LoadMetadataStep {
    discovery: Arc<dyn InstanceDiscovery>,
}

impl LoadMetadataStep {
    pub fn new(discovery: Arc<dyn InstanceDiscovery>) -> Self {
        LoadMetadataStep { discovery }
    }
}

#[async_trait]
impl PipelineStep for LoadMetadataStep {
    fn name(&self) -> &'static str {
        "load_metadata"
    }

    async fn run(&self, ctx: &mut SglContext) -> Result<(), PipelineError> {
        let mut ids: Vec<String> = ctx
            .manager
            .contexts()
            .iter()
            .map(|c| c.instance_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(());
        }

        let instances: HashMap<String, Instance> = self
            .discovery
            .describe_instances(&ids)
            .await?
            .into_iter()
            .map(|i| (i.instance_id.clone(), i))
            .collect();
        debug!(requested = ids.len(), described = instances.len(), "loaded instance metadata");

        if matches!(
            ctx.event.transition,
            LifecycleTransition::Launching | LifecycleTransition::Draining
        ) && !instances.contains_key(&ctx.event.instance_id)
        {
            return Err(PipelineError::InstanceNotFound(ctx.event.instance_id.clone()));
        }

        for context in ctx.manager.contexts_mut() {
            context.instance = instances.get(&context.instance_id).cloned();
        }
        Ok(())
    }
}
