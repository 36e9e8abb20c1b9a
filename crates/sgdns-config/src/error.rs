use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration row '{key}' not found in repository")]
    MissingRow { key: String },

    #[error("configuration row '{key}' has no 'config' payload")]
    MissingPayload { key: String },

    #[error("base64 decode failed for row '{key}': {message}")]
    Decode { key: String, message: String },

    #[error("json parse error in row '{key}': {source}")]
    JsonParse {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration row '{key}' decoded to zero items")]
    Empty { key: String },

    #[error("invalid configuration item '{item}': {message}")]
    InvalidItem { item: String, message: String },

    #[error("environment variable '{var}' invalid: {message}")]
    Environment { var: String, message: String },

    #[error("store error: {0}")]
    Store(#[from] sgdns_store::StoreError),

    #[error("domain error: {0}")]
    Domain(#[from] sgdns_domain::DomainError),
}

impl ConfigError {
    pub fn invalid_item(item: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidItem { item: item.into(), message: message.into() }
    }
}
