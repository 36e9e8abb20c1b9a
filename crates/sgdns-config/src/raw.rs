use serde::{Deserialize, Serialize};

/// Raw persisted representation of one scaling-group configuration item, as
/// found (base64-encoded, JSON) in the repository rows. Enum-valued fields
/// stay strings here; parsing and validation happen in the loader.
#[derive(Debug, Deserialize, Serialize)]
pub struct RawScalingGroupConfig {
    pub scaling_group_name: String,
    pub dns_config: RawDnsRecordConfig,
    /// Absent means ALL_OPERATIONAL.
    #[serde(default)]
    pub multiple_config_proceed_mode: Option<String>,
    #[serde(default)]
    pub readiness_config: Option<RawReadinessConfig>,
    #[serde(default)]
    pub health_check_config: Option<RawHealthCheckConfig>,
    #[serde(default)]
    pub what_if: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawDnsRecordConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    pub dns_zone_id: String,
    pub record_name: String,
    #[serde(default = "default_record_type")]
    pub record_type: String,
    #[serde(default = "default_record_ttl")]
    pub record_ttl: u32,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_empty_mode")]
    pub empty_mode: String,
    #[serde(default)]
    pub empty_mode_value: String,
    #[serde(default = "default_value_source")]
    pub value_source: String,
    #[serde(default)]
    pub srv_priority: u16,
    #[serde(default)]
    pub srv_weight: u16,
    #[serde(default)]
    pub srv_port: u16,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawReadinessConfig {
    #[serde(default)]
    pub enabled: bool,
    pub tag_key: String,
    pub tag_value: String,
    #[serde(default = "default_readiness_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_readiness_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawHealthCheckConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_value_source")]
    pub endpoint_source: String,
    pub protocol: String,
    pub port: u16,
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_health_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub abandon_on_failure: bool,
}

fn default_provider() -> String {
    "route53".to_string()
}

fn default_record_type() -> String {
    "A".to_string()
}

fn default_record_ttl() -> u32 {
    60
}

fn default_mode() -> String {
    "MULTIVALUE".to_string()
}

fn default_empty_mode() -> String {
    "KEEP".to_string()
}

fn default_value_source() -> String {
    "ip:v4:private".to_string()
}

fn default_readiness_interval() -> u64 {
    5
}

fn default_readiness_timeout() -> u64 {
    300
}

fn default_health_timeout() -> u64 {
    5
}
