use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid lifecycle event: {0}")]
    InvalidEvent(String),

    #[error("invalid value source '{value_source}': {reason}")]
    ValueSource { value_source: String, reason: String },

    #[error("unresolvable value source '{value_source}' for instance {instance_id}")]
    UnresolvableValue { value_source: String, instance_id: String },

    #[error("validation error: {0}")]
    Validation(String),
}

impl DomainError {
    pub fn value_source(source: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::ValueSource { value_source: source.into(), reason: reason.into() }
    }
}
