use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Namespaced key/value rows in an external table (DynamoDB, CosmosDB, ..).
///
/// Items are JSON objects. `create` is the conditional primitive everything
/// else builds on: it writes only when the key is absent and reports a
/// conflict by returning `None`, which is how the distributed lock and the
/// GC marker stay race-free.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Conditional create: `Some(item)` when written, `None` when the key
    /// already exists.
    async fn create(&self, key: &str, item: Value) -> Result<Option<Value>, StoreError>;

    /// Unconditional upsert.
    async fn put(&self, key: &str, item: Value) -> Result<(), StoreError>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}
