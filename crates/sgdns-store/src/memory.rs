use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::kv::KvStore;
use crate::queue::Queue;

/// In-memory implementation of [`KvStore`].
///
/// All data is lost on process exit. Suitable for tests and the mock
/// provider wiring.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKvStore {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly, bypassing the conditional-create contract.
    pub async fn seed(&self, key: impl Into<String>, item: Value) {
        self.inner.write().await.insert(key.into(), item);
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.get(key).cloned())
    }

    async fn create(&self, key: &str, item: Value) -> Result<Option<Value>, StoreError> {
        let mut guard = self.inner.write().await;
        if guard.contains_key(key) {
            return Ok(None);
        }
        guard.insert(key.to_string(), item.clone());
        Ok(Some(item))
    }

    async fn put(&self, key: &str, item: Value) -> Result<(), StoreError> {
        self.inner.write().await.insert(key.to_string(), item);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.remove(key).is_some())
    }
}

/// In-memory implementation of [`Queue`]; enqueued envelopes can be drained
/// by tests to assert what would have been published.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueue {
    inner: Arc<RwLock<Vec<Value>>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn drain(&self) -> Vec<Value> {
        std::mem::take(&mut *self.inner.write().await)
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    async fn enqueue(&self, envelope: Value) -> Result<bool, StoreError> {
        self.inner.write().await.push(envelope);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn create_is_conditional() {
        let kv = InMemoryKvStore::new();
        let first = kv.create("k", json!({"n": 1})).await.unwrap();
        assert!(first.is_some());
        let second = kv.create("k", json!({"n": 2})).await.unwrap();
        assert!(second.is_none());
        assert_eq!(kv.get("k").await.unwrap().unwrap(), json!({"n": 1}));
    }

    #[tokio::test]
    async fn put_overwrites_and_delete_reports_existence() {
        let kv = InMemoryKvStore::new();
        kv.put("k", json!({"n": 1})).await.unwrap();
        kv.put("k", json!({"n": 2})).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().unwrap(), json!({"n": 2}));
        assert!(kv.delete("k").await.unwrap());
        assert!(!kv.delete("k").await.unwrap());
    }
}
