use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;

use sgdns_config::{DnsProviderKind, DnsRecordType};

use crate::error::ProviderError;
use crate::provider::{qualify, DnsProvider};
use crate::request::{
    DnsChangeRequest, DnsChangeRequestAction, DnsChangeResponse, ResourceRecordSet,
};

/// Transport behind the Route53 provider. Implementations own signing,
/// endpoints, and propagation waiting; this crate only builds and interprets
/// the payloads.
#[async_trait]
pub trait Route53Api: Send + Sync + 'static {
    /// Zone name for a hosted zone id, e.g. `example.com.`.
    async fn get_hosted_zone_name(&self, zone_id: &str) -> Result<String, ProviderError>;

    /// Record sets at (name, type), raw wire JSON. A filtered
    /// `ListResourceRecordSets` page is enough.
    async fn list_resource_record_sets(
        &self,
        zone_id: &str,
        record_name: &str,
        record_type: &str,
    ) -> Result<Vec<Value>, ProviderError>;

    async fn change_resource_record_sets(
        &self,
        zone_id: &str,
        change_batch: Value,
    ) -> Result<(), ProviderError>;
}

/// Route53 zone backend: reads records back into neutral form and serializes
/// planned changes into `ChangeBatch` wire JSON.
pub struct Route53Provider {
    api: Arc<dyn Route53Api>,
    /// Zone names never change for a given id; cache per process.
    zone_names: RwLock<HashMap<String, String>>,
}

impl Route53Provider {
    pub fn new(api: Arc<dyn Route53Api>) -> Self {
        Route53Provider { api, zone_names: RwLock::new(HashMap::new()) }
    }

    async fn zone_name(&self, zone_id: &str) -> Result<String, ProviderError> {
        if let Some(name) = self.zone_names.read().await.get(zone_id) {
            return Ok(name.clone());
        }
        let name = self.api.get_hosted_zone_name(zone_id).await?;
        self.zone_names
            .write()
            .await
            .insert(zone_id.to_string(), name.clone());
        Ok(name)
    }
}

#[async_trait]
impl DnsProvider for Route53Provider {
    fn kind(&self) -> DnsProviderKind {
        DnsProviderKind::Route53
    }

    async fn read_record(
        &self,
        zone_id: &str,
        record_name: &str,
        record_type: DnsRecordType,
    ) -> Result<Option<ResourceRecordSet>, ProviderError> {
        let records = self
            .api
            .list_resource_record_sets(zone_id, record_name, record_type.as_str())
            .await?;
        for record in records {
            let name = record
                .get("Name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim_end_matches('.');
            let rtype = record.get("Type").and_then(Value::as_str).unwrap_or_default();
            if name != record_name || rtype != record_type.as_str() {
                continue;
            }
            let ttl = record.get("TTL").and_then(Value::as_u64).unwrap_or_default() as u32;
            let values = record
                .get("ResourceRecords")
                .and_then(Value::as_array)
                .map(|rrs| {
                    rrs.iter()
                        .filter_map(|rr| rr.get("Value").and_then(Value::as_str))
                        .map(|v| decode_wire_value(record_type, v))
                        .collect()
                })
                .unwrap_or_default();
            return Ok(Some(ResourceRecordSet {
                name: record_name.to_string(),
                record_type,
                ttl,
                values,
            }));
        }
        Ok(None)
    }

    async fn apply_change(
        &self,
        request: &DnsChangeRequest,
    ) -> Result<DnsChangeResponse, ProviderError> {
        request.validate()?;
        if request.is_ignore() {
            return Ok(DnsChangeResponse::ok());
        }
        let change_batch = build_change_batch(request)?;
        debug!(zone = %request.zone_id, batch = %change_batch, "applying route53 change");
        self.api
            .change_resource_record_sets(&request.zone_id, change_batch.clone())
            .await?;
        Ok(DnsChangeResponse {
            success: true,
            message: None,
            metadata: Some(change_batch),
        })
    }

    async fn normalize_name(
        &self,
        record_name: &str,
        zone_id: &str,
    ) -> Result<String, ProviderError> {
        let zone_name = self.zone_name(zone_id).await?;
        Ok(qualify(record_name, &zone_name))
    }
}

// ── Wire format ───────────────────────────────────────────────────────────────

/// Serialize a planned change into a Route53 `ChangeBatch`.
///
/// CREATE and UPDATE both map to `UPSERT`; DELETE carries the record's prior
/// values so Route53 can match the set being removed.
pub fn build_change_batch(request: &DnsChangeRequest) -> Result<Value, ProviderError> {
    let action = match request.action {
        DnsChangeRequestAction::Create | DnsChangeRequestAction::Update => "UPSERT",
        DnsChangeRequestAction::Delete => "DELETE",
        DnsChangeRequestAction::Ignore => {
            return Err(ProviderError::InvalidRequest(
                "IGNORE requests cannot be serialized".to_string(),
            ))
        }
    };
    let resource_records = encode_resource_records(request)?;
    Ok(json!({
        "Changes": [{
            "Action": action,
            "ResourceRecordSet": {
                "Name": request.record_name,
                "Type": request.record_type.as_str(),
                "TTL": request.ttl,
                "ResourceRecords": resource_records,
            }
        }]
    }))
}

fn encode_resource_records(request: &DnsChangeRequest) -> Result<Vec<Value>, ProviderError> {
    let mut values = request.values.clone();
    values.sort();
    values.dedup();
    if values.is_empty() {
        return Err(ProviderError::InvalidRequest(format!(
            "{} request for {} has no values",
            request.action, request.record_name
        )));
    }
    match request.record_type {
        DnsRecordType::A | DnsRecordType::Aaaa => {
            Ok(values.iter().map(|v| json!({ "Value": v })).collect())
        }
        DnsRecordType::Cname => {
            if values.len() != 1 {
                return Err(ProviderError::InvalidRequest(format!(
                    "CNAME record {} requires exactly one value, got {}",
                    request.record_name,
                    values.len()
                )));
            }
            Ok(vec![json!({ "Value": values[0] })])
        }
        DnsRecordType::Srv => Ok(values
            .iter()
            .map(|target| {
                json!({
                    "Value": format!(
                        "{} {} {} {}",
                        request.srv_priority, request.srv_weight, request.srv_port, target
                    )
                })
            })
            .collect()),
        DnsRecordType::Txt => Ok(values
            .iter()
            .map(|v| json!({ "Value": format!("\"{}\"", v) }))
            .collect()),
    }
}

/// Invert the wire encoding so planner comparisons see plain values.
fn decode_wire_value(record_type: DnsRecordType, wire: &str) -> String {
    match record_type {
        DnsRecordType::Txt => wire.trim_matches('"').to_string(),
        DnsRecordType::Srv => wire
            .rsplit(' ')
            .next()
            .unwrap_or(wire)
            .to_string(),
        _ => wire.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(record_type: DnsRecordType, values: &[&str]) -> DnsChangeRequest {
        DnsChangeRequest {
            action: DnsChangeRequestAction::Update,
            zone_id: "Z1".to_string(),
            record_name: "svc.example.com".to_string(),
            record_type,
            ttl: 300,
            srv_priority: 10,
            srv_weight: 5,
            srv_port: 8080,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn a_record_values_are_deduped_and_sorted() {
        let batch =
            build_change_batch(&request(DnsRecordType::A, &["10.0.0.2", "10.0.0.1", "10.0.0.2"]))
                .unwrap();
        let rrs = &batch["Changes"][0]["ResourceRecordSet"]["ResourceRecords"];
        assert_eq!(rrs[0]["Value"], "10.0.0.1");
        assert_eq!(rrs[1]["Value"], "10.0.0.2");
        assert_eq!(rrs.as_array().unwrap().len(), 2);
        assert_eq!(batch["Changes"][0]["Action"], "UPSERT");
    }

    #[test]
    fn cname_requires_exactly_one_value() {
        assert!(build_change_batch(&request(DnsRecordType::Cname, &["a.example.com"])).is_ok());
        assert!(
            build_change_batch(&request(DnsRecordType::Cname, &["a.example.com", "b.example.com"]))
                .is_err()
        );
    }

    #[test]
    fn srv_values_carry_the_priority_weight_port_prefix() {
        let batch = build_change_batch(&request(DnsRecordType::Srv, &["node1.example.com"])).unwrap();
        let value = &batch["Changes"][0]["ResourceRecordSet"]["ResourceRecords"][0]["Value"];
        assert_eq!(value, "10 5 8080 node1.example.com");
    }

    #[test]
    fn txt_values_are_quoted() {
        let batch = build_change_batch(&request(DnsRecordType::Txt, &["hello"])).unwrap();
        let value = &batch["Changes"][0]["ResourceRecordSet"]["ResourceRecords"][0]["Value"];
        assert_eq!(value, "\"hello\"");
    }

    #[test]
    fn delete_maps_to_delete_action() {
        let mut req = request(DnsRecordType::A, &["10.0.0.1"]);
        req.action = DnsChangeRequestAction::Delete;
        let batch = build_change_batch(&req).unwrap();
        assert_eq!(batch["Changes"][0]["Action"], "DELETE");
    }

    #[test]
    fn wire_values_decode_back_to_plain_form() {
        assert_eq!(decode_wire_value(DnsRecordType::Txt, "\"hello\""), "hello");
        assert_eq!(
            decode_wire_value(DnsRecordType::Srv, "10 5 8080 node1.example.com"),
            "node1.example.com"
        );
        assert_eq!(decode_wire_value(DnsRecordType::A, "10.0.0.1"), "10.0.0.1");
    }

    // ── Provider over an in-memory transport ─────────────────────────────────

    #[derive(Default)]
    struct FakeRoute53 {
        records: std::sync::Mutex<Vec<Value>>,
        applied: std::sync::Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl Route53Api for FakeRoute53 {
        async fn get_hosted_zone_name(&self, _zone_id: &str) -> Result<String, ProviderError> {
            Ok("example.com.".to_string())
        }

        async fn list_resource_record_sets(
            &self,
            _zone_id: &str,
            _record_name: &str,
            _record_type: &str,
        ) -> Result<Vec<Value>, ProviderError> {
            Ok(self.records.lock().unwrap().clone())
        }

        async fn change_resource_record_sets(
            &self,
            _zone_id: &str,
            change_batch: Value,
        ) -> Result<(), ProviderError> {
            self.applied.lock().unwrap().push(change_batch);
            Ok(())
        }
    }

    #[tokio::test]
    async fn read_record_matches_name_and_type_and_decodes_values() {
        let api = Arc::new(FakeRoute53::default());
        api.records.lock().unwrap().push(json!({
            "Name": "svc.example.com.",
            "Type": "TXT",
            "TTL": 60,
            "ResourceRecords": [{ "Value": "\"alpha\"" }, { "Value": "\"beta\"" }]
        }));
        let provider = Route53Provider::new(api);
        let record = provider
            .read_record("Z1", "svc.example.com", DnsRecordType::Txt)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.values, vec!["alpha", "beta"]);
        assert!(provider
            .read_record("Z1", "svc.example.com", DnsRecordType::A)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn normalize_name_uses_the_cached_zone_name() {
        let provider = Route53Provider::new(Arc::new(FakeRoute53::default()));
        assert_eq!(
            provider.normalize_name("svc", "Z1").await.unwrap(),
            "svc.example.com"
        );
        assert_eq!(
            provider.normalize_name("svc.example.com.", "Z1").await.unwrap(),
            "svc.example.com"
        );
    }

    #[tokio::test]
    async fn apply_change_sends_the_built_batch() {
        let api = Arc::new(FakeRoute53::default());
        let provider = Route53Provider::new(api.clone());
        let response = provider
            .apply_change(&request(DnsRecordType::A, &["10.0.0.1"]))
            .await
            .unwrap();
        assert!(response.success);
        let applied = api.applied.lock().unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0]["Changes"][0]["Action"], "UPSERT");
    }
}
