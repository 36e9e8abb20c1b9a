use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::kv::KvStore;

/// Key of the garbage-collection marker row for a DNS configuration.
pub fn gc_marker_key(dns_config_hash: &str) -> String {
    format!("gc:{}", dns_config_hash)
}

/// Values that a drain pass wanted to remove but could not, because removing
/// them would have emptied the record and the configuration says to keep it.
/// The next non-empty planning cycle for the same configuration subtracts
/// these values and deletes the marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcMarker {
    pub garbage_values: Vec<String>,
}

impl GcMarker {
    pub fn new(mut garbage_values: Vec<String>) -> Self {
        garbage_values.sort();
        GcMarker { garbage_values }
    }
}

/// Typed access to GC marker rows over the shared [`KvStore`].
#[derive(Clone)]
pub struct GcMarkerStore {
    kv: Arc<dyn KvStore>,
}

impl GcMarkerStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        GcMarkerStore { kv }
    }

    pub async fn read(&self, dns_config_hash: &str) -> Result<Option<GcMarker>, StoreError> {
        let key = gc_marker_key(dns_config_hash);
        match self.kv.get(&key).await? {
            None => Ok(None),
            Some(item) => Ok(Some(serde_json::from_value(item)?)),
        }
    }

    /// Write or overwrite the marker. An existing marker with the same value
    /// set is left untouched.
    pub async fn write(&self, dns_config_hash: &str, marker: &GcMarker) -> Result<(), StoreError> {
        let key = gc_marker_key(dns_config_hash);
        if let Some(existing) = self.read(dns_config_hash).await? {
            if existing == *marker {
                return Ok(());
            }
        }
        debug!(key, values = ?marker.garbage_values, "writing gc marker");
        let item: Value = serde_json::to_value(marker)?;
        self.kv.put(&key, item).await
    }

    /// Returns whether a marker existed.
    pub async fn clear(&self, dns_config_hash: &str) -> Result<bool, StoreError> {
        let key = gc_marker_key(dns_config_hash);
        let existed = self.kv.delete(&key).await?;
        if existed {
            debug!(key, "cleared gc marker");
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryKvStore;

    #[tokio::test]
    async fn write_read_clear_round_trip() {
        let store = GcMarkerStore::new(Arc::new(InMemoryKvStore::new()));
        let marker = GcMarker::new(vec!["10.0.0.3".to_string()]);

        assert!(store.read("h1").await.unwrap().is_none());
        store.write("h1", &marker).await.unwrap();
        assert_eq!(store.read("h1").await.unwrap().unwrap(), marker);
        assert!(store.clear("h1").await.unwrap());
        assert!(!store.clear("h1").await.unwrap());
    }

    #[tokio::test]
    async fn write_overwrites_differing_value_set() {
        let store = GcMarkerStore::new(Arc::new(InMemoryKvStore::new()));
        store
            .write("h1", &GcMarker::new(vec!["10.0.0.3".to_string()]))
            .await
            .unwrap();
        let replacement = GcMarker::new(vec!["10.0.0.4".to_string(), "10.0.0.3".to_string()]);
        store.write("h1", &replacement).await.unwrap();
        assert_eq!(store.read("h1").await.unwrap().unwrap(), replacement);
    }

    #[test]
    fn marker_values_are_sorted() {
        let marker = GcMarker::new(vec!["b".to_string(), "a".to_string()]);
        assert_eq!(marker.garbage_values, vec!["a", "b"]);
    }
}
