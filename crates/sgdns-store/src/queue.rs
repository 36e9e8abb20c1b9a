use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Outbound message queue used to fan out reconciliation work.
#[async_trait]
pub trait Queue: Send + Sync + 'static {
    /// Returns whether the envelope was accepted by the broker.
    async fn enqueue(&self, envelope: Value) -> Result<bool, StoreError>;
}
