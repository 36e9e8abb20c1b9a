use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use sgdns_domain::ValueSource;

use crate::error::ConfigError;

/// Record types that may carry more than one value under `Multivalue` mapping.
const MULTIVALUE_RECORD_TYPES: &[DnsRecordType] = &[
    DnsRecordType::A,
    DnsRecordType::Aaaa,
    DnsRecordType::Txt,
    DnsRecordType::Srv,
];

const MAX_RECORD_TTL: u32 = 604_800;

// ── Enums ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsProviderKind {
    Route53,
    Cloudflare,
    Mock,
}

impl std::fmt::Display for DnsProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DnsProviderKind::Route53 => write!(f, "route53"),
            DnsProviderKind::Cloudflare => write!(f, "cloudflare"),
            DnsProviderKind::Mock => write!(f, "mock"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DnsRecordType {
    A,
    #[serde(rename = "AAAA")]
    Aaaa,
    #[serde(rename = "CNAME")]
    Cname,
    #[serde(rename = "SRV")]
    Srv,
    #[serde(rename = "TXT")]
    Txt,
}

impl DnsRecordType {
    /// Parse a record type, normalizing case. The persisted form is uppercase.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Some(DnsRecordType::A),
            "AAAA" => Some(DnsRecordType::Aaaa),
            "CNAME" => Some(DnsRecordType::Cname),
            "SRV" => Some(DnsRecordType::Srv),
            "TXT" => Some(DnsRecordType::Txt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DnsRecordType::A => "A",
            DnsRecordType::Aaaa => "AAAA",
            DnsRecordType::Cname => "CNAME",
            DnsRecordType::Srv => "SRV",
            DnsRecordType::Txt => "TXT",
        }
    }
}

impl std::fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How instance values map onto the record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordMappingMode {
    /// The record carries one value per operational instance.
    Multivalue,
    /// The record carries a single value, taken from the most recently
    /// launched operational instance.
    SingleLatest,
}

impl std::fmt::Display for RecordMappingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordMappingMode::Multivalue => write!(f, "MULTIVALUE"),
            RecordMappingMode::SingleLatest => write!(f, "SINGLE_LATEST"),
        }
    }
}

/// What to do when a planned update would leave the record set empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmptyRecordMode {
    /// Leave the record untouched and persist a GC marker so the stale values
    /// are dropped on the next non-empty cycle.
    Keep,
    /// Delete the record outright.
    Delete,
    /// Point the record at a fixed fallback value.
    Fixed,
}

impl std::fmt::Display for EmptyRecordMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmptyRecordMode::Keep => write!(f, "KEEP"),
            EmptyRecordMode::Delete => write!(f, "DELETE"),
            EmptyRecordMode::Fixed => write!(f, "FIXED"),
        }
    }
}

/// Whether non-operational sibling configurations block DNS mutations when a
/// scaling group has more than one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProceedMode {
    /// Proceed only when every sibling configuration is operational.
    AllOperational,
    /// Proceed whenever this configuration itself is operational.
    SelfOperational,
    /// Proceed when at least half (rounded up) of the siblings are
    /// operational.
    HalfOperational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthCheckProtocol {
    Tcp,
    Http,
    Https,
}

impl HealthCheckProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthCheckProtocol::Tcp => "TCP",
            HealthCheckProtocol::Http => "HTTP",
            HealthCheckProtocol::Https => "HTTPS",
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            HealthCheckProtocol::Tcp => "tcp",
            HealthCheckProtocol::Http => "http",
            HealthCheckProtocol::Https => "https",
        }
    }
}

impl std::fmt::Display for HealthCheckProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── DnsRecordConfig ───────────────────────────────────────────────────────────

/// How a single DNS record tracks a scaling group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecordConfig {
    pub provider: DnsProviderKind,
    pub zone_id: String,
    pub record_name: String,
    pub record_type: DnsRecordType,
    pub record_ttl: u32,
    pub mode: RecordMappingMode,
    pub empty_mode: EmptyRecordMode,
    pub empty_mode_value: String,
    /// Which instance attribute becomes the record value; compact
    /// `type[:subtype][:attribute]` form, validated at construction.
    pub value_source: String,
    pub srv_priority: u16,
    pub srv_weight: u16,
    pub srv_port: u16,
}

impl DnsRecordConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zone_id.is_empty() {
            return Err(invalid_dns(self, "zone id is required"));
        }
        if self.record_name.is_empty() {
            return Err(invalid_dns(self, "record name is required"));
        }
        if self.record_ttl < 1 || self.record_ttl > MAX_RECORD_TTL {
            return Err(invalid_dns(
                self,
                format!("record ttl {} outside [1, {}]", self.record_ttl, MAX_RECORD_TTL),
            ));
        }
        if self.mode == RecordMappingMode::Multivalue
            && !MULTIVALUE_RECORD_TYPES.contains(&self.record_type)
        {
            return Err(invalid_dns(
                self,
                format!("record type {} does not support MULTIVALUE mapping", self.record_type),
            ));
        }
        if self.record_type == DnsRecordType::Srv
            && (self.srv_priority == 0 || self.srv_weight == 0)
        {
            return Err(invalid_dns(self, "SRV records require nonzero priority and weight"));
        }
        if self.empty_mode == EmptyRecordMode::Fixed && self.empty_mode_value.is_empty() {
            return Err(invalid_dns(self, "FIXED empty mode requires a fallback value"));
        }
        ValueSource::parse(&self.value_source)?;
        Ok(())
    }

    /// The parsed form of `value_source`. Infallible after `validate`, but
    /// surfaced as a `Result` so callers that skipped validation still fail
    /// loudly rather than planning around a bad source.
    pub fn parsed_value_source(&self) -> Result<ValueSource, sgdns_domain::DomainError> {
        ValueSource::parse(&self.value_source)
    }

    /// Deterministic digest over every persisted field. Two configurations
    /// hash equal iff all fields are equal; planner work and GC markers are
    /// keyed by this.
    pub fn hash(&self) -> String {
        let canonical = format!(
            "p:{}/z:{}/n:{}/t:{}/ttl:{}/m:{}/e:{}/ev:{}/vs:{}/srv:{},{},{}",
            self.provider,
            self.zone_id,
            self.record_name,
            self.record_type,
            self.record_ttl,
            self.mode,
            self.empty_mode,
            self.empty_mode_value,
            self.value_source,
            self.srv_priority,
            self.srv_weight,
            self.srv_port,
        );
        let digest = Sha256::digest(canonical.as_bytes());
        format!("{:x}", digest)
    }
}

fn invalid_dns(config: &DnsRecordConfig, message: impl Into<String>) -> ConfigError {
    ConfigError::invalid_item(
        format!("{}/{}", config.zone_id, config.record_name),
        message.into(),
    )
}

// ── Probe configurations ──────────────────────────────────────────────────────

/// Tag-match gate that holds DNS registration until an instance finishes
/// bootstrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessConfig {
    pub enabled: bool,
    pub tag_key: String,
    pub tag_value: String,
    /// Seconds between probes.
    pub interval_secs: u64,
    /// Overall deadline in seconds.
    pub timeout_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        ReadinessConfig {
            enabled: false,
            tag_key: "app:readiness:status".to_string(),
            tag_value: "ready".to_string(),
            interval_secs: 5,
            timeout_secs: 300,
        }
    }
}

impl ReadinessConfig {
    pub fn hash(&self) -> String {
        let canonical = format!(
            "e:{}/k:{}/v:{}/i:{}/t:{}",
            self.enabled, self.tag_key, self.tag_value, self.interval_secs, self.timeout_secs,
        );
        let digest = Sha256::digest(canonical.as_bytes());
        format!("{:x}", digest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    pub enabled: bool,
    /// Value source resolving the endpoint address to probe.
    pub endpoint_source: String,
    pub protocol: HealthCheckProtocol,
    pub port: u16,
    /// Request path for HTTP(S) probes; defaulted to `/` on decode.
    pub path: String,
    pub timeout_secs: u64,
    /// When set, a failed probe abandons the instance launch at the source.
    pub abandon_on_failure: bool,
}

impl HealthCheckConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::invalid_item(
                "health_check",
                "port must be in [1, 65535]",
            ));
        }
        if self.timeout_secs < 1 || self.timeout_secs > 60 {
            return Err(ConfigError::invalid_item(
                "health_check",
                format!("timeout {}s outside [1, 60]", self.timeout_secs),
            ));
        }
        if self.endpoint_source.is_empty() {
            return Err(ConfigError::invalid_item(
                "health_check",
                "endpoint source is required",
            ));
        }
        ValueSource::parse(&self.endpoint_source)?;
        Ok(())
    }

    pub fn hash(&self) -> String {
        let canonical = format!(
            "e:{}/es:{}/p:{}/pt:{}/pth:{}/t:{}/a:{}",
            self.enabled,
            self.endpoint_source,
            self.protocol,
            self.port,
            self.path,
            self.timeout_secs,
            self.abandon_on_failure,
        );
        let digest = Sha256::digest(canonical.as_bytes());
        format!("{:x}", digest)
    }
}

// ── ScalingGroupConfig ────────────────────────────────────────────────────────

/// One DNS tracking rule for a scaling group. A group may have several, each
/// with its own record, probes, and proceed mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingGroupConfig {
    pub scaling_group_name: String,
    pub dns_config: DnsRecordConfig,
    pub readiness_config: Option<ReadinessConfig>,
    pub health_check_config: Option<HealthCheckConfig>,
    pub proceed_mode: ProceedMode,
    /// When set, planned changes are logged but never applied.
    pub what_if: bool,
}

impl ScalingGroupConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scaling_group_name.is_empty() {
            return Err(ConfigError::invalid_item("", "scaling group name is required"));
        }
        self.dns_config.validate()?;
        if let Some(hc) = &self.health_check_config {
            hc.validate()?;
        }
        Ok(())
    }
}

/// Identity: the `(group, zone, record name, record type)` tuple.
impl std::fmt::Display for ScalingGroupConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.scaling_group_name,
            self.dns_config.zone_id,
            self.dns_config.record_name,
            self.dns_config.record_type,
        )
    }
}

impl PartialEq for ScalingGroupConfig {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for ScalingGroupConfig {}

/// Every tracking rule known to the process, as loaded from the repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScalingGroupConfigs {
    pub items: Vec<ScalingGroupConfig>,
}

impl ScalingGroupConfigs {
    pub fn for_scaling_group(&self, name: &str) -> Vec<ScalingGroupConfig> {
        self.items
            .iter()
            .filter(|item| item.scaling_group_name == name)
            .cloned()
            .collect()
    }

    /// Distinct scaling group names, in first-seen order.
    pub fn scaling_group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for item in &self.items {
            if !names.contains(&item.scaling_group_name) {
                names.push(item.scaling_group_name.clone());
            }
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
