use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    #[error("discovery error: {0}")]
    Discovery(String),

    #[error("domain error: {0}")]
    Domain(#[from] sgdns_domain::DomainError),
}
