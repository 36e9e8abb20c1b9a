use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use sgdns_config::{DnsRecordConfig, EmptyRecordMode};
use sgdns_store::GcMarkerStore;

use crate::command::{DnsChangeAction, DnsChangeCommand};
use crate::error::ProviderError;
use crate::provider::ProviderRegistry;
use crate::request::{DnsChangeRequest, DnsChangeRequestAction};

/// Turns a [`DnsChangeCommand`] into the concrete [`DnsChangeRequest`] that
/// reconciles the record with the command, by reading the record's current
/// state through the configured provider.
///
/// The algorithm is identical for every provider; only reads, writes, and
/// name normalization go through the provider port. The planner also owns
/// the GC-marker contract: a KEEP-mode drain that would empty the record
/// persists the would-be-removed values under `gc:{config hash}`, and the
/// next plan for the same configuration subtracts and clears them.
pub struct ChangePlanner {
    registry: Arc<ProviderRegistry>,
    gc: GcMarkerStore,
}

impl ChangePlanner {
    pub fn new(registry: Arc<ProviderRegistry>, gc: GcMarkerStore) -> Self {
        ChangePlanner { registry, gc }
    }

    pub async fn plan(&self, command: &DnsChangeCommand) -> Result<DnsChangeRequest, ProviderError> {
        let dns = &command.dns_config;
        let provider = self.registry.for_kind(dns.provider)?;
        let record_name = provider.normalize_name(&dns.record_name, &dns.zone_id).await?;
        let record = provider
            .read_record(&dns.zone_id, &record_name, dns.record_type)
            .await?;
        let record_exists = record.is_some();
        let config_hash = dns.hash();

        // Current values: sorted, minus the FIXED placeholder, minus anything
        // a previous cycle marked as garbage.
        let mut current: Vec<String> = record.map(|r| r.values).unwrap_or_default();
        current.sort();
        if dns.empty_mode == EmptyRecordMode::Fixed {
            current.retain(|v| *v != dns.empty_mode_value);
        }
        let marker = self.gc.read(&config_hash).await?;
        if let Some(marker) = &marker {
            current.retain(|v| !marker.garbage_values.contains(v));
        }

        let command_values = command.command_values();

        let request = match command.action {
            DnsChangeAction::Append => {
                self.plan_append(dns, &record_name, record_exists, &current, &command_values)
            }
            DnsChangeAction::Remove => {
                self.plan_remove(dns, &record_name, record_exists, &current, &command_values)
                    .await?
            }
            DnsChangeAction::Replace => {
                self.plan_replace(dns, &record_name, record_exists, &current, &command_values)
                    .await?
            }
        };

        if !request.is_ignore() {
            request.validate()?;
            if marker.is_some() {
                self.gc.clear(&config_hash).await?;
            }
        }
        debug!(record = %record_name, plan = %request, "planned dns change");
        Ok(request)
    }

    fn plan_append(
        &self,
        dns: &DnsRecordConfig,
        record_name: &str,
        record_exists: bool,
        current: &[String],
        command_values: &[String],
    ) -> DnsChangeRequest {
        if command_values.is_empty() {
            return DnsChangeRequest::ignore();
        }
        let desired: Vec<String> = match dns.mode {
            sgdns_config::RecordMappingMode::Multivalue => {
                let union: BTreeSet<&String> = current.iter().chain(command_values).collect();
                union.into_iter().cloned().collect()
            }
            sgdns_config::RecordMappingMode::SingleLatest => command_values.to_vec(),
        };
        if record_exists && as_set(&desired) == as_set(current) {
            return DnsChangeRequest::ignore();
        }
        build_request(upsert_action(record_exists), dns, record_name, desired)
    }

    async fn plan_remove(
        &self,
        dns: &DnsRecordConfig,
        record_name: &str,
        record_exists: bool,
        current: &[String],
        command_values: &[String],
    ) -> Result<DnsChangeRequest, ProviderError> {
        if !record_exists || current.is_empty() {
            return Ok(DnsChangeRequest::ignore());
        }
        let desired: Vec<String> = current
            .iter()
            .filter(|v| !command_values.contains(v))
            .cloned()
            .collect();
        if desired.is_empty() {
            return self.plan_empty_set(dns, record_name, current).await;
        }
        Ok(build_request(DnsChangeRequestAction::Update, dns, record_name, desired))
    }

    async fn plan_replace(
        &self,
        dns: &DnsRecordConfig,
        record_name: &str,
        record_exists: bool,
        current: &[String],
        command_values: &[String],
    ) -> Result<DnsChangeRequest, ProviderError> {
        if command_values.is_empty() {
            if current.is_empty() {
                return Ok(DnsChangeRequest::ignore());
            }
            return self.plan_empty_set(dns, record_name, current).await;
        }
        if record_exists && as_set(command_values) == as_set(current) {
            return Ok(DnsChangeRequest::ignore());
        }
        Ok(build_request(
            upsert_action(record_exists),
            dns,
            record_name,
            command_values.to_vec(),
        ))
    }

    /// The computed desired set came out empty; the configuration decides.
    async fn plan_empty_set(
        &self,
        dns: &DnsRecordConfig,
        record_name: &str,
        current: &[String],
    ) -> Result<DnsChangeRequest, ProviderError> {
        match dns.empty_mode {
            EmptyRecordMode::Keep => {
                let marker = sgdns_store::GcMarker::new(current.to_vec());
                self.gc.write(&dns.hash(), &marker).await?;
                Ok(DnsChangeRequest::ignore())
            }
            EmptyRecordMode::Delete => Ok(build_request(
                DnsChangeRequestAction::Delete,
                dns,
                record_name,
                current.to_vec(),
            )),
            EmptyRecordMode::Fixed => Ok(build_request(
                DnsChangeRequestAction::Update,
                dns,
                record_name,
                vec![dns.empty_mode_value.clone()],
            )),
        }
    }
}

fn upsert_action(record_exists: bool) -> DnsChangeRequestAction {
    if record_exists {
        DnsChangeRequestAction::Update
    } else {
        DnsChangeRequestAction::Create
    }
}

fn as_set(values: &[String]) -> BTreeSet<&String> {
    values.iter().collect()
}

fn build_request(
    action: DnsChangeRequestAction,
    dns: &DnsRecordConfig,
    record_name: &str,
    values: Vec<String>,
) -> DnsChangeRequest {
    DnsChangeRequest {
        action,
        zone_id: dns.zone_id.clone(),
        record_name: record_name.to_string(),
        record_type: dns.record_type,
        ttl: dns.record_ttl,
        srv_priority: dns.srv_priority,
        srv_weight: dns.srv_weight,
        srv_port: dns.srv_port,
        values,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sgdns_config::{
        DnsProviderKind, DnsRecordConfig, DnsRecordType, EmptyRecordMode, RecordMappingMode,
    };
    use sgdns_store::{GcMarker, GcMarkerStore, InMemoryKvStore};

    use crate::command::{DnsChangeAction, DnsChangeCommand, DnsValue};
    use crate::mock::MockProvider;
    use crate::provider::ProviderRegistry;
    use crate::request::DnsChangeRequestAction;

    use super::*;

    struct Fixture {
        planner: ChangePlanner,
        provider: Arc<MockProvider>,
        gc: GcMarkerStore,
    }

    fn fixture() -> Fixture {
        let provider = Arc::new(MockProvider::new().with_zone("Z1", "example.com"));
        let mut registry = ProviderRegistry::new();
        registry.register(provider.clone());
        let gc = GcMarkerStore::new(Arc::new(InMemoryKvStore::new()));
        Fixture {
            planner: ChangePlanner::new(Arc::new(registry), gc.clone()),
            provider,
            gc,
        }
    }

    fn dns_config(mode: RecordMappingMode, empty_mode: EmptyRecordMode) -> DnsRecordConfig {
        DnsRecordConfig {
            provider: DnsProviderKind::Mock,
            zone_id: "Z1".to_string(),
            record_name: "svc".to_string(),
            record_type: DnsRecordType::A,
            record_ttl: 60,
            mode,
            empty_mode,
            empty_mode_value: if empty_mode == EmptyRecordMode::Fixed {
                "10.255.255.255".to_string()
            } else {
                String::new()
            },
            value_source: "ip:v4:private".to_string(),
            srv_priority: 0,
            srv_weight: 0,
            srv_port: 0,
        }
    }

    fn value(v: &str, launch: i64, id: &str) -> DnsValue {
        DnsValue { value: v.to_string(), launch_timestamp: launch, instance_id: id.to_string() }
    }

    async fn seed(provider: &MockProvider, values: &[&str]) {
        provider
            .seed_record("Z1", "svc.example.com", DnsRecordType::A, 60, values)
            .await;
    }

    #[tokio::test]
    async fn append_unions_into_multivalue_record() {
        let f = fixture();
        seed(&f.provider, &["10.0.0.1", "10.0.0.2"]).await;
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Append,
            dns_config(RecordMappingMode::Multivalue, EmptyRecordMode::Keep),
            vec![value("10.0.0.3", 10, "i-new")],
        );
        let request = f.planner.plan(&cmd).await.unwrap();
        assert_eq!(request.action, DnsChangeRequestAction::Update);
        assert_eq!(request.values, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    }

    #[tokio::test]
    async fn append_of_known_value_is_ignored() {
        let f = fixture();
        seed(&f.provider, &["10.0.0.1", "10.0.0.2"]).await;
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Append,
            dns_config(RecordMappingMode::Multivalue, EmptyRecordMode::Keep),
            vec![value("10.0.0.2", 10, "i-old")],
        );
        assert!(f.planner.plan(&cmd).await.unwrap().is_ignore());
    }

    #[tokio::test]
    async fn append_to_missing_record_creates_it() {
        let f = fixture();
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Append,
            dns_config(RecordMappingMode::Multivalue, EmptyRecordMode::Keep),
            vec![value("10.0.0.3", 10, "i-new")],
        );
        let request = f.planner.plan(&cmd).await.unwrap();
        assert_eq!(request.action, DnsChangeRequestAction::Create);
        assert_eq!(request.values, vec!["10.0.0.3"]);
    }

    #[tokio::test]
    async fn remove_from_missing_record_is_ignored() {
        let f = fixture();
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Remove,
            dns_config(RecordMappingMode::Multivalue, EmptyRecordMode::Delete),
            vec![value("10.0.0.3", 10, "i-old")],
        );
        assert!(f.planner.plan(&cmd).await.unwrap().is_ignore());
    }

    #[tokio::test]
    async fn remove_leaving_values_updates_the_record() {
        let f = fixture();
        seed(&f.provider, &["10.0.0.1", "10.0.0.2"]).await;
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Remove,
            dns_config(RecordMappingMode::Multivalue, EmptyRecordMode::Keep),
            vec![value("10.0.0.1", 10, "i-old")],
        );
        let request = f.planner.plan(&cmd).await.unwrap();
        assert_eq!(request.action, DnsChangeRequestAction::Update);
        assert_eq!(request.values, vec!["10.0.0.2"]);
    }

    #[tokio::test]
    async fn draining_last_value_with_keep_writes_gc_marker() {
        let f = fixture();
        seed(&f.provider, &["10.0.0.3"]).await;
        let config = dns_config(RecordMappingMode::Multivalue, EmptyRecordMode::Keep);
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Remove,
            config.clone(),
            vec![value("10.0.0.3", 10, "i-old")],
        );
        let request = f.planner.plan(&cmd).await.unwrap();
        assert!(request.is_ignore());
        let marker = f.gc.read(&config.hash()).await.unwrap().unwrap();
        assert_eq!(marker.garbage_values, vec!["10.0.0.3"]);
    }

    #[tokio::test]
    async fn draining_last_value_with_delete_targets_prior_values() {
        let f = fixture();
        seed(&f.provider, &["10.0.0.3"]).await;
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Remove,
            dns_config(RecordMappingMode::Multivalue, EmptyRecordMode::Delete),
            vec![value("10.0.0.3", 10, "i-old")],
        );
        let request = f.planner.plan(&cmd).await.unwrap();
        assert_eq!(request.action, DnsChangeRequestAction::Delete);
        assert_eq!(request.values, vec!["10.0.0.3"]);
    }

    #[tokio::test]
    async fn draining_last_value_with_fixed_pins_the_fallback() {
        let f = fixture();
        seed(&f.provider, &["10.0.0.3"]).await;
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Remove,
            dns_config(RecordMappingMode::Multivalue, EmptyRecordMode::Fixed),
            vec![value("10.0.0.3", 10, "i-old")],
        );
        let request = f.planner.plan(&cmd).await.unwrap();
        assert_eq!(request.action, DnsChangeRequestAction::Update);
        assert_eq!(request.values, vec!["10.255.255.255"]);
    }

    #[tokio::test]
    async fn launch_after_keep_marker_drops_garbage_and_clears_marker() {
        let f = fixture();
        seed(&f.provider, &["10.0.0.3"]).await;
        let config = dns_config(RecordMappingMode::SingleLatest, EmptyRecordMode::Keep);
        f.gc
            .write(&config.hash(), &GcMarker::new(vec!["10.0.0.3".to_string()]))
            .await
            .unwrap();

        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Append,
            config.clone(),
            vec![value("10.0.0.9", 50, "i-new")],
        );
        let request = f.planner.plan(&cmd).await.unwrap();
        assert_eq!(request.action, DnsChangeRequestAction::Update);
        assert_eq!(request.values, vec!["10.0.0.9"]);
        assert!(f.gc.read(&config.hash()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_with_identical_set_is_ignored() {
        let f = fixture();
        seed(&f.provider, &["10.0.0.2", "10.0.0.1"]).await;
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Replace,
            dns_config(RecordMappingMode::Multivalue, EmptyRecordMode::Keep),
            vec![value("10.0.0.1", 1, "i-a"), value("10.0.0.2", 2, "i-b")],
        );
        assert!(f.planner.plan(&cmd).await.unwrap().is_ignore());
    }

    #[tokio::test]
    async fn replace_with_differing_set_upserts() {
        let f = fixture();
        seed(&f.provider, &["10.0.0.1", "10.0.0.9"]).await;
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Replace,
            dns_config(RecordMappingMode::Multivalue, EmptyRecordMode::Keep),
            vec![value("10.0.0.1", 1, "i-a"), value("10.0.0.2", 2, "i-b")],
        );
        let request = f.planner.plan(&cmd).await.unwrap();
        assert_eq!(request.action, DnsChangeRequestAction::Update);
        assert_eq!(request.values, vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[tokio::test]
    async fn fixed_placeholder_is_invisible_to_planning() {
        let f = fixture();
        seed(&f.provider, &["10.255.255.255"]).await;
        let cmd = DnsChangeCommand::new(
            DnsChangeAction::Append,
            dns_config(RecordMappingMode::Multivalue, EmptyRecordMode::Fixed),
            vec![value("10.0.0.1", 1, "i-a")],
        );
        let request = f.planner.plan(&cmd).await.unwrap();
        assert_eq!(request.values, vec!["10.0.0.1"]);
    }
}
