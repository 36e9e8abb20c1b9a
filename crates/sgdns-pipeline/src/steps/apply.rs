use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use sgdns_dns::ProviderRegistry;

use crate::context::{AppliedChange, SglContext};
use crate::error::PipelineError;
use crate::metrics::MetricsSink;
use crate::steps::PipelineStep;

/// Applies the accumulated changes through their providers. The only stage
/// that mutates anything. A failed apply is recorded and the batch
/// continues; what-if configurations log the change and stop there.
pub struct ApplyDnsChangesStep {
    registry: Arc<ProviderRegistry>,
    metrics: Arc<dyn MetricsSink>,
}

impl ApplyDnsChangesStep {
    pub fn new(registry: Arc<ProviderRegistry>, metrics: Arc<dyn MetricsSink>) -> Self {
        ApplyDnsChangesStep { registry, metrics }
    }
}

#[async_trait]
impl PipelineStep for ApplyDnsChangesStep {
    fn name(&self) -> &'static str {
        "apply_dns"
    }

    async fn run(&self, ctx: &mut SglContext) -> Result<(), PipelineError> {
        for planned in &ctx.planned_changes {
            let context = &ctx.manager.contexts()[planned.context_index];
            let sg_config = &context.sg_config;

            if sg_config.what_if {
                info!(change = %planned.request, "what-if mode: change not applied");
                continue;
            }
            if planned.request.is_ignore() {
                debug!(context = %context, "nothing to change");
                continue;
            }
            info!(
                scaling_group = %sg_config.scaling_group_name,
                instance_id = %context.instance_id,
                change = %planned.request,
                "applying dns change"
            );

            let provider = match self.registry.for_kind(sg_config.dns_config.provider) {
                Ok(provider) => provider,
                Err(e) => {
                    error!(error = %e, "provider unavailable");
                    self.metrics.record_point("dns_change_failures", 1.0, "Count");
                    ctx.applied_changes.push(AppliedChange {
                        change: planned.request.canonical(),
                        success: false,
                    });
                    continue;
                }
            };

            match provider.apply_change(&planned.request).await {
                Ok(response) if response.success => {
                    debug!(change = %planned.request, "dns change applied");
                    self.metrics.record_point("dns_changes_applied", 1.0, "Count");
                    ctx.applied_changes.push(AppliedChange {
                        change: planned.request.canonical(),
                        success: true,
                    });
                }
                Ok(response) => {
                    error!(
                        change = %planned.request,
                        message = response.message.as_deref().unwrap_or(""),
                        "dns change rejected"
                    );
                    self.metrics.record_point("dns_change_failures", 1.0, "Count");
                    ctx.applied_changes.push(AppliedChange {
                        change: planned.request.canonical(),
                        success: false,
                    });
                }
                Err(e) => {
                    error!(change = %planned.request, error = %e, "dns change failed");
                    self.metrics.record_point("dns_change_failures", 1.0, "Count");
                    ctx.applied_changes.push(AppliedChange {
                        change: planned.request.canonical(),
                        success: false,
                    });
                }
            }
        }
        Ok(())
    }
}
