use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use sgdns_config::{DnsProviderKind, DnsRecordType};

use crate::error::ProviderError;
use crate::provider::{qualify, DnsProvider};
use crate::request::{
    DnsChangeRequest, DnsChangeRequestAction, DnsChangeResponse, ResourceRecordSet,
};

#[derive(Debug, Default)]
struct Zone {
    name: String,
    records: HashMap<(String, DnsRecordType), ResourceRecordSet>,
}

/// An in-memory zone backend.
///
/// Holds whole zones in process memory and mutates them directly. Backs the
/// `mock` provider kind for tests and the `simulate` command; no I/O.
#[derive(Debug, Default)]
pub struct MockProvider {
    zones: RwLock<HashMap<String, Zone>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(mut self, zone_id: impl Into<String>, zone_name: impl Into<String>) -> Self {
        self.zones.get_mut().insert(
            zone_id.into(),
            Zone { name: zone_name.into(), records: HashMap::new() },
        );
        self
    }

    /// Seed an existing record, keyed by its fully-qualified name.
    pub async fn seed_record(
        &self,
        zone_id: &str,
        record_name: &str,
        record_type: DnsRecordType,
        ttl: u32,
        values: &[&str],
    ) {
        let mut zones = self.zones.write().await;
        if let Some(zone) = zones.get_mut(zone_id) {
            zone.records.insert(
                (record_name.to_string(), record_type),
                ResourceRecordSet {
                    name: record_name.to_string(),
                    record_type,
                    ttl,
                    values: values.iter().map(|v| v.to_string()).collect(),
                },
            );
        }
    }

    /// Current values of a record, for assertions.
    pub async fn record_values(
        &self,
        zone_id: &str,
        record_name: &str,
        record_type: DnsRecordType,
    ) -> Option<Vec<String>> {
        let zones = self.zones.read().await;
        zones
            .get(zone_id)
            .and_then(|zone| zone.records.get(&(record_name.to_string(), record_type)))
            .map(|record| record.values.clone())
    }
}

#[async_trait]
impl DnsProvider for MockProvider {
    fn kind(&self) -> DnsProviderKind {
        DnsProviderKind::Mock
    }

    async fn read_record(
        &self,
        zone_id: &str,
        record_name: &str,
        record_type: DnsRecordType,
    ) -> Result<Option<ResourceRecordSet>, ProviderError> {
        let zones = self.zones.read().await;
        let zone = zones
            .get(zone_id)
            .ok_or_else(|| ProviderError::ZoneNotFound(zone_id.to_string()))?;
        Ok(zone.records.get(&(record_name.to_string(), record_type)).cloned())
    }

    async fn apply_change(
        &self,
        request: &DnsChangeRequest,
    ) -> Result<DnsChangeResponse, ProviderError> {
        request.validate()?;
        if request.is_ignore() {
            return Ok(DnsChangeResponse::ok());
        }
        let mut zones = self.zones.write().await;
        let zone = zones
            .get_mut(&request.zone_id)
            .ok_or_else(|| ProviderError::ZoneNotFound(request.zone_id.clone()))?;
        let key = (request.record_name.clone(), request.record_type);
        match request.action {
            DnsChangeRequestAction::Create | DnsChangeRequestAction::Update => {
                let mut values = request.values.clone();
                values.sort();
                values.dedup();
                debug!(record = %request.record_name, ?values, "mock upsert");
                zone.records.insert(
                    key,
                    ResourceRecordSet {
                        name: request.record_name.clone(),
                        record_type: request.record_type,
                        ttl: request.ttl,
                        values,
                    },
                );
            }
            DnsChangeRequestAction::Delete => {
                debug!(record = %request.record_name, "mock delete");
                zone.records.remove(&key);
            }
            DnsChangeRequestAction::Ignore => {}
        }
        Ok(DnsChangeResponse::ok())
    }

    async fn normalize_name(
        &self,
        record_name: &str,
        zone_id: &str,
    ) -> Result<String, ProviderError> {
        let zones = self.zones.read().await;
        let zone = zones
            .get(zone_id)
            .ok_or_else(|| ProviderError::ZoneNotFound(zone_id.to_string()))?;
        Ok(qualify(record_name, &zone.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_then_delete_round_trip() {
        let provider = MockProvider::new().with_zone("Z1", "example.com");
        let request = DnsChangeRequest {
            action: DnsChangeRequestAction::Create,
            zone_id: "Z1".to_string(),
            record_name: "svc.example.com".to_string(),
            record_type: DnsRecordType::A,
            ttl: 60,
            srv_priority: 0,
            srv_weight: 0,
            srv_port: 0,
            values: vec!["10.0.0.2".to_string(), "10.0.0.1".to_string(), "10.0.0.2".to_string()],
        };
        provider.apply_change(&request).await.unwrap();
        assert_eq!(
            provider.record_values("Z1", "svc.example.com", DnsRecordType::A).await.unwrap(),
            vec!["10.0.0.1", "10.0.0.2"]
        );

        let mut delete = request.clone();
        delete.action = DnsChangeRequestAction::Delete;
        provider.apply_change(&delete).await.unwrap();
        assert!(provider
            .record_values("Z1", "svc.example.com", DnsRecordType::A)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn applying_the_same_request_twice_is_idempotent() {
        let provider = MockProvider::new().with_zone("Z1", "example.com");
        let request = DnsChangeRequest {
            action: DnsChangeRequestAction::Update,
            zone_id: "Z1".to_string(),
            record_name: "svc.example.com".to_string(),
            record_type: DnsRecordType::A,
            ttl: 60,
            srv_priority: 0,
            srv_weight: 0,
            srv_port: 0,
            values: vec!["10.0.0.1".to_string()],
        };
        provider.apply_change(&request).await.unwrap();
        let first = provider.record_values("Z1", "svc.example.com", DnsRecordType::A).await;
        provider.apply_change(&request).await.unwrap();
        let second = provider.record_values("Z1", "svc.example.com", DnsRecordType::A).await;
        assert_eq!(first, second);
    }
}
