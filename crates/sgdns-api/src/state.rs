use std::sync::Arc;

use sgdns_config::SgConfigService;
use sgdns_pipeline::LifecyclePipeline;
use sgdns_store::KvStore;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<LifecyclePipeline>,
    pub config_service: Arc<SgConfigService>,
    pub kv: Arc<dyn KvStore>,
    pub auth_token: Arc<String>,
    /// Concurrency cap for inline reconciliation sweeps.
    pub reconcile_max_concurrency: usize,
}
