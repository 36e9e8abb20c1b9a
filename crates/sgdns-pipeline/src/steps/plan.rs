use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use sgdns_dns::{ChangePlanner, DnsChangeAction, DnsChangeCommand, DnsValue};
use sgdns_domain::LifecycleTransition;

use crate::context::{PlannedChange, SglContext};
use crate::error::PipelineError;
use crate::steps::PipelineStep;

/// Plans one provider-neutral DNS change per operational context (one per
/// distinct record for reconciliation sweeps). Planning failures are
/// per-context: the owning context's change is dropped and siblings proceed.
pub struct PlanDnsChangesStep {
    planner: Arc<ChangePlanner>,
}

impl PlanDnsChangesStep {
    pub fn new(planner: Arc<ChangePlanner>) -> Self {
        PlanDnsChangesStep { planner }
    }

    fn command_action(transition: LifecycleTransition) -> Option<DnsChangeAction> {
        match transition {
            LifecycleTransition::Launching => Some(DnsChangeAction::Append),
            LifecycleTransition::Draining => Some(DnsChangeAction::Remove),
            LifecycleTransition::Reconciling => Some(DnsChangeAction::Replace),
            LifecycleTransition::Unrelated => None,
        }
    }
}

#[async_trait]
impl PipelineStep for PlanDnsChangesStep {
    fn name(&self) -> &'static str {
        "plan_dns"
    }

    async fn run(&self, ctx: &mut SglContext) -> Result<(), PipelineError> {
        let Some(action) = Self::command_action(ctx.event.transition) else {
            return Ok(());
        };

        // Resolve each operational context's record value up front; failures
        // stay with the owning context.
        let mut resolved: Vec<(usize, DnsValue)> = Vec::new();
        for index in ctx.manager.operational_context_indices() {
            let context = &ctx.manager.contexts()[index];
            let Some(instance) = &context.instance else {
                warn!(context = %context, "no instance model; skipping");
                ctx.plan_errors
                    .push(format!("{}: instance model not loaded", context));
                continue;
            };
            let value = context
                .sg_config
                .dns_config
                .parsed_value_source()
                .and_then(|source| source.resolve(instance));
            match value {
                Ok(metadata) => resolved.push((
                    index,
                    DnsValue {
                        value: metadata.value,
                        launch_timestamp: metadata.launch_timestamp,
                        instance_id: metadata.instance_id,
                    },
                )),
                Err(e) => {
                    warn!(context = %context, error = %e, "value resolution failed");
                    ctx.plan_errors.push(format!("{}: {}", context, e));
                }
            }
        }

        // A replace reconciles the whole record at once: group the resolved
        // values of every context sharing a record configuration into a
        // single command. Hook-driven transitions carry one value each.
        let mut commands: Vec<(usize, DnsChangeCommand)> = Vec::new();
        if action == DnsChangeAction::Replace {
            let mut by_config: BTreeMap<String, (usize, Vec<DnsValue>)> = BTreeMap::new();
            for (index, value) in resolved {
                let config = &ctx.manager.contexts()[index].sg_config.dns_config;
                by_config
                    .entry(config.hash())
                    .or_insert_with(|| (index, Vec::new()))
                    .1
                    .push(value);
            }
            for (index, values) in by_config.into_values() {
                let config = ctx.manager.contexts()[index].sg_config.dns_config.clone();
                commands.push((index, DnsChangeCommand::new(action, config, values)));
            }
        } else {
            for (index, value) in resolved {
                let config = ctx.manager.contexts()[index].sg_config.dns_config.clone();
                commands.push((index, DnsChangeCommand::new(action, config, vec![value])));
            }
        }

        for (index, command) in commands {
            match self.planner.plan(&command).await {
                Ok(request) => {
                    debug!(plan = %request, "planned change");
                    ctx.planned_changes.push(PlannedChange { context_index: index, request });
                }
                Err(e) => {
                    let context = &ctx.manager.contexts()[index];
                    warn!(context = %context, error = %e, "planning failed");
                    ctx.plan_errors.push(format!("{}: {}", context, e));
                }
            }
        }
        Ok(())
    }
}
