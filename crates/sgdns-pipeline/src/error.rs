use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] sgdns_config::ConfigError),

    #[error("store error: {0}")]
    Store(#[from] sgdns_store::StoreError),

    #[error("dns provider error: {0}")]
    Provider(#[from] sgdns_dns::ProviderError),

    #[error("probe error: {0}")]
    Probe(#[from] sgdns_probe::ProbeError),

    #[error("domain error: {0}")]
    Domain(#[from] sgdns_domain::DomainError),

    #[error("no configuration found for scaling group '{0}'")]
    NoConfiguration(String),

    #[error("instance {0} could not be described")]
    InstanceNotFound(String),

    #[error("failed to acquire lock for scaling group '{0}'")]
    LockUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}
