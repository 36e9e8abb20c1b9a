use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use sgdns_config::{DnsProviderKind, DnsRecordType};

use crate::error::ProviderError;
use crate::request::{DnsChangeRequest, DnsChangeResponse, ResourceRecordSet};

/// A managed-zone DNS backend.
///
/// Providers read records back in neutral form, apply planned changes in
/// their own wire format, and own record-name normalization for their zones.
/// Change *planning* is provider-neutral and lives in
/// [`ChangePlanner`](crate::plan::ChangePlanner).
#[async_trait]
pub trait DnsProvider: Send + Sync + 'static {
    fn kind(&self) -> DnsProviderKind;

    async fn read_record(
        &self,
        zone_id: &str,
        record_name: &str,
        record_type: DnsRecordType,
    ) -> Result<Option<ResourceRecordSet>, ProviderError>;

    async fn apply_change(
        &self,
        request: &DnsChangeRequest,
    ) -> Result<DnsChangeResponse, ProviderError>;

    /// Fully-qualify `record_name` within the zone: ensure the trailing zone
    /// suffix, trim any trailing dot.
    async fn normalize_name(&self, record_name: &str, zone_id: &str)
        -> Result<String, ProviderError>;
}

/// Dispatches DNS calls to the provider each configuration names.
pub struct ProviderRegistry {
    providers: HashMap<DnsProviderKind, Arc<dyn DnsProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        ProviderRegistry { providers: HashMap::new() }
    }

    pub fn register(&mut self, provider: Arc<dyn DnsProvider>) -> &mut Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn for_kind(&self, kind: DnsProviderKind) -> Result<Arc<dyn DnsProvider>, ProviderError> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or(ProviderError::NotConfigured(kind))
    }

    pub fn active_kinds(&self) -> Vec<DnsProviderKind> {
        self.providers.keys().copied().collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Ensure `record_name` carries the zone suffix, with no trailing dot.
pub(crate) fn qualify(record_name: &str, zone_name: &str) -> String {
    let zone = zone_name.trim_end_matches('.');
    let name = record_name.trim_end_matches('.');
    if name == zone || name.ends_with(&format!(".{}", zone)) {
        name.to_string()
    } else {
        format!("{}.{}", name, zone)
    }
}
