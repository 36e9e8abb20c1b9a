use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::kv::KvStore;

/// Key of the mutual-exclusion row for a scaling group.
pub fn sg_lock_key(scaling_group_name: &str) -> String {
    format!("lock:{}", scaling_group_name)
}

/// Mutual exclusion across concurrent pipeline invocations.
///
/// `acquire` returns `false` when the lock is held elsewhere; it never
/// blocks. `release` is idempotent and must be safe to call on every exit
/// path, including paths where acquisition failed.
#[async_trait]
pub trait LockStore: Send + Sync + 'static {
    async fn acquire(&self, key: &str) -> Result<bool, StoreError>;
    async fn release(&self, key: &str) -> Result<(), StoreError>;
    async fn check(&self, key: &str) -> Result<bool, StoreError>;
}

// ── KV-backed lock ────────────────────────────────────────────────────────────

/// Lock rows in the shared KV table: existence of the row means the lock is
/// held. Acquisition is a conditional create, so two concurrent acquirers
/// cannot both succeed.
pub struct KvLockStore {
    kv: Arc<dyn KvStore>,
}

impl KvLockStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        KvLockStore { kv }
    }
}

#[async_trait]
impl LockStore for KvLockStore {
    async fn acquire(&self, key: &str) -> Result<bool, StoreError> {
        debug!(key, "acquiring lock");
        let item = json!({ "timestamp": Utc::now().timestamp() });
        let created = self.kv.create(key, item).await?;
        Ok(created.is_some())
    }

    async fn release(&self, key: &str) -> Result<(), StoreError> {
        debug!(key, "releasing lock");
        self.kv.delete(key).await?;
        Ok(())
    }

    async fn check(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.kv.get(key).await?.is_some())
    }
}

// ── Retrying decorator ────────────────────────────────────────────────────────

/// Decorator that retries acquisition with incremental backoff: attempt n
/// sleeps n seconds before the next try, so ten attempts span roughly one
/// minute. Exhaustion surfaces as `Ok(false)`, never as an error.
pub struct RetryingLockStore<L: LockStore> {
    inner: L,
    max_attempts: u32,
    backoff_unit: Duration,
}

impl<L: LockStore> RetryingLockStore<L> {
    pub fn new(inner: L) -> Self {
        RetryingLockStore { inner, max_attempts: 10, backoff_unit: Duration::from_secs(1) }
    }

    /// Shrink the backoff unit; tests use milliseconds.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }
}

#[async_trait]
impl<L: LockStore> LockStore for RetryingLockStore<L> {
    async fn acquire(&self, key: &str) -> Result<bool, StoreError> {
        for attempt in 1..=self.max_attempts {
            if self.inner.acquire(key).await? {
                return Ok(true);
            }
            if attempt < self.max_attempts {
                debug!(key, attempt, max = self.max_attempts, "waiting for lock");
                tokio::time::sleep(self.backoff_unit * attempt).await;
            }
        }
        warn!(key, attempts = self.max_attempts, "lock acquisition exhausted");
        Ok(false)
    }

    async fn release(&self, key: &str) -> Result<(), StoreError> {
        self.inner.release(key).await
    }

    async fn check(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.check(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryKvStore;

    fn lock_store() -> (Arc<InMemoryKvStore>, KvLockStore) {
        let kv = Arc::new(InMemoryKvStore::new());
        let lock = KvLockStore::new(kv.clone());
        (kv, lock)
    }

    #[tokio::test]
    async fn second_acquire_fails_until_release() {
        let (_kv, lock) = lock_store();
        let key = sg_lock_key("web");
        assert!(lock.acquire(&key).await.unwrap());
        assert!(!lock.acquire(&key).await.unwrap());
        lock.release(&key).await.unwrap();
        assert!(lock.acquire(&key).await.unwrap());
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let (_kv, lock) = lock_store();
        let key = sg_lock_key("web");
        lock.release(&key).await.unwrap();
        assert!(lock.acquire(&key).await.unwrap());
        lock.release(&key).await.unwrap();
        lock.release(&key).await.unwrap();
    }

    #[tokio::test]
    async fn retrying_store_gives_up_after_max_attempts() {
        let (_kv, inner) = lock_store();
        let key = sg_lock_key("web");
        inner.acquire(&key).await.unwrap();

        let retrying = RetryingLockStore::new(inner)
            .with_max_attempts(3)
            .with_backoff_unit(Duration::from_millis(1));
        assert!(!retrying.acquire(&key).await.unwrap());
    }

    #[tokio::test]
    async fn retrying_store_picks_up_a_freed_lock() {
        let kv = Arc::new(InMemoryKvStore::new());
        let key = sg_lock_key("web");
        KvLockStore::new(kv.clone()).acquire(&key).await.unwrap();

        let kv_for_release = kv.clone();
        let key_for_release = key.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            kv_for_release.delete(&key_for_release).await.unwrap();
        });

        let retrying = RetryingLockStore::new(KvLockStore::new(kv))
            .with_backoff_unit(Duration::from_millis(2));
        assert!(retrying.acquire(&key).await.unwrap());
    }
}
