use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use sgdns_config::{ReadinessConfig, ReconciliationConfig, SgConfigService};
use sgdns_domain::LifecycleTransition;
use sgdns_probe::InstanceDiscovery;

use crate::context::{InstanceLifecycleContext, SglContext};
use crate::error::PipelineError;
use crate::steps::PipelineStep;

/// Loads the scaling group's configuration set and spawns one instance
/// context per (instance, configuration) pairing.
///
/// Hook-driven events concern exactly the event's instance. A reconciliation
/// event fans out to every current group member in a valid membership state.
pub struct InitStep {
    config_service: Arc<SgConfigService>,
    discovery: Arc<dyn InstanceDiscovery>,
    readiness_defaults: ReadinessConfig,
    reconciliation: ReconciliationConfig,
}

impl InitStep {
    pub fn new(
        config_service: Arc<SgConfigService>,
        discovery: Arc<dyn InstanceDiscovery>,
        readiness_defaults: ReadinessConfig,
        reconciliation: ReconciliationConfig,
    ) -> Self {
        InitStep { config_service, discovery, readiness_defaults, reconciliation }
    }

    async fn instance_ids_for(&self, ctx: &SglContext) -> Result<Vec<String>, PipelineError> {
        match ctx.event.transition {
            LifecycleTransition::Launching | LifecycleTransition::Draining => {
                Ok(vec![ctx.event.instance_id.clone()])
            }
            LifecycleTransition::Reconciling => {
                let groups = self
                    .discovery
                    .describe_scaling_groups(&[ctx.event.scaling_group_name.clone()])
                    .await?;
                let ids = groups
                    .first()
                    .map(|g| {
                        g.instances
                            .iter()
                            .filter(|i| {
                                self.reconciliation.valid_states.is_empty()
                                    || self.reconciliation.valid_states.contains(&i.lifecycle_state)
                            })
                            .map(|i| i.instance_id.clone())
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(ids)
            }
            LifecycleTransition::Unrelated => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl PipelineStep for InitStep {
    fn name(&self) -> &'static str {
        "init"
    }

    async fn run(&self, ctx: &mut SglContext) -> Result<(), PipelineError> {
        ctx.event.validate()?;

        let all_configs = self.config_service.get_configs().await?;
        let sg_configs = all_configs.for_scaling_group(&ctx.event.scaling_group_name);
        if sg_configs.is_empty() {
            warn!(scaling_group = %ctx.event.scaling_group_name, "no configurations found");
            return Err(PipelineError::NoConfiguration(
                ctx.event.scaling_group_name.clone(),
            ));
        }

        let instance_ids = self.instance_ids_for(ctx).await?;
        debug!(
            configs = sg_configs.len(),
            instances = instance_ids.len(),
            "initialized lifecycle contexts"
        );

        for sg_config in &sg_configs {
            // An item without its own readiness gate inherits the
            // environment-wide default.
            let readiness = sg_config
                .readiness_config
                .clone()
                .or_else(|| Some(self.readiness_defaults.clone()));
            for instance_id in &instance_ids {
                ctx.manager.register(InstanceLifecycleContext::new(
                    instance_id.clone(),
                    sg_config.clone(),
                    readiness.clone(),
                    sg_config.health_check_config.clone(),
                ));
            }
        }
        ctx.sg_configs = sg_configs;
        Ok(())
    }
}
