use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a readiness probe for one (instance, readiness config) pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResult {
    pub ready: bool,
    pub instance_id: String,
    /// Hash of the readiness configuration the probe ran with. Used to fan the
    /// result back to every context sharing that configuration.
    pub config_hash: String,
    pub time_taken_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ReadinessResult {
    pub fn passed(instance_id: impl Into<String>, config_hash: impl Into<String>) -> Self {
        ReadinessResult {
            ready: true,
            instance_id: instance_id.into(),
            config_hash: config_hash.into(),
            time_taken_ms: 0,
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of a health probe against one resolved endpoint.
///
/// Most fields are observability payload: when something is unhealthy it
/// matters why, and the consumer decides what to do about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub config_hash: String,
    pub instance_id: String,
    pub protocol: String,
    pub endpoint: String,
    pub status: Option<u16>,
    pub message: Option<String>,
    pub time_taken_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl HealthCheckResult {
    pub fn passed(instance_id: impl Into<String>, config_hash: impl Into<String>) -> Self {
        HealthCheckResult {
            healthy: true,
            config_hash: config_hash.into(),
            instance_id: instance_id.into(),
            protocol: String::new(),
            endpoint: String::new(),
            status: None,
            message: None,
            time_taken_ms: 0,
            timestamp: Utc::now(),
        }
    }
}

impl std::fmt::Display for HealthCheckResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} healthy:{} status:{:?} in {}ms",
            self.protocol, self.endpoint, self.healthy, self.status, self.time_taken_ms
        )
    }
}

/// A value resolved from instance metadata through a value source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataResult {
    pub instance_id: String,
    pub value: String,
    /// Canonical form of the value source the value came from.
    pub source: String,
    /// Launch time of the owning instance, epoch seconds. Carried so record
    /// mapping can pick the most recently launched instance.
    pub launch_timestamp: i64,
}
