use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use sgdns_config::SgConfigService;
use sgdns_domain::{LifecycleEvent, LifecycleTransition};
use sgdns_store::Queue;

use crate::error::PipelineError;
use crate::outcome::LifecycleOutcome;
use crate::scheduler::SchedulerPool;
use crate::workflow::LifecyclePipeline;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    /// Restrict the sweep to one scaling group; `None` sweeps every group
    /// that has configurations.
    pub scaling_group_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub outcomes: Vec<(String, LifecycleOutcome)>,
}

impl ReconcileReport {
    pub fn all_handled(&self) -> bool {
        self.outcomes.iter().all(|(_, o)| o.handled)
    }
}

/// Run a reconciliation sweep inline: one RECONCILING pipeline invocation
/// per scaling group, at most `max_concurrency` at a time. Outcomes are
/// collected in completion order.
pub async fn reconcile(
    req: ReconcileRequest,
    pipeline: Arc<LifecyclePipeline>,
    config_service: Arc<SgConfigService>,
    max_concurrency: usize,
) -> Result<ReconcileReport, PipelineError> {
    let names = target_groups(&req, &config_service).await?;
    info!(groups = names.len(), "starting reconciliation sweep");

    let pool = SchedulerPool::new(max_concurrency.max(1));
    let mut scheduler = pool.scheduler::<(String, LifecycleOutcome)>();
    for name in names {
        let pipeline = pipeline.clone();
        let event = LifecycleEvent::new(LifecycleTransition::Reconciling, name.clone(), "")?;
        scheduler
            .place(async move { (name, pipeline.handle(event).await) })
            .await?;
    }

    let mut outcomes = Vec::new();
    while let Some(outcome) = scheduler.retrieve_next().await {
        debug!(scaling_group = %outcome.0, handled = outcome.1.handled, "group reconciled");
        outcomes.push(outcome);
    }
    Ok(ReconcileReport { outcomes })
}

/// Publish one reconciliation envelope per scaling group instead of running
/// inline, for deployments where a broker feeds the event handler. Returns
/// the number of envelopes accepted.
pub async fn enqueue_reconciliation(
    req: ReconcileRequest,
    queue: Arc<dyn Queue>,
    config_service: Arc<SgConfigService>,
) -> Result<usize, PipelineError> {
    let names = target_groups(&req, &config_service).await?;
    let mut accepted = 0usize;
    for name in names {
        let envelope = json!({
            "message_id": Uuid::new_v4().to_string(),
            "message_type": "ScalingGroupReconciliationRequest",
            "schema_version": "v1",
            "scaling_group_name": name,
        });
        if queue.enqueue(envelope).await? {
            accepted += 1;
        }
    }
    Ok(accepted)
}

async fn target_groups(
    req: &ReconcileRequest,
    config_service: &SgConfigService,
) -> Result<Vec<String>, PipelineError> {
    let configs = config_service.get_configs().await?;
    let names = match &req.scaling_group_name {
        Some(name) => {
            if configs.for_scaling_group(name).is_empty() {
                return Err(PipelineError::NoConfiguration(name.clone()));
            }
            vec![name.clone()]
        }
        None => configs.scaling_group_names(),
    };
    Ok(names)
}
