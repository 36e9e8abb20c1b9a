use thiserror::Error;

use sgdns_config::DnsProviderKind;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("dns provider '{0}' is not configured")]
    NotConfigured(DnsProviderKind),

    #[error("zone not found: {0}")]
    ZoneNotFound(String),

    #[error("provider api error: {0}")]
    Api(String),

    #[error("invalid change request: {0}")]
    InvalidRequest(String),

    #[error("store error: {0}")]
    Store(#[from] sgdns_store::StoreError),
}
