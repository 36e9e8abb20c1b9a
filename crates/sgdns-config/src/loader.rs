use std::sync::Arc;

use base64::Engine;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use sgdns_store::KvStore;

use crate::env::DbConfig;
use crate::error::ConfigError;
use crate::models::{
    DnsProviderKind, DnsRecordConfig, DnsRecordType, EmptyRecordMode, HealthCheckConfig,
    HealthCheckProtocol, ProceedMode, ReadinessConfig, RecordMappingMode, ScalingGroupConfig,
    ScalingGroupConfigs,
};
use crate::raw::{
    RawDnsRecordConfig, RawHealthCheckConfig, RawReadinessConfig, RawScalingGroupConfig,
};

/// Decode a base64-encoded JSON list of configuration items, with full
/// validation. `key` only labels errors.
pub fn decode_config_items(
    key: &str,
    payload_b64: &str,
) -> Result<Vec<ScalingGroupConfig>, ConfigError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload_b64.trim())
        .map_err(|e| ConfigError::Decode { key: key.to_string(), message: e.to_string() })?;
    let raw_items: Vec<RawScalingGroupConfig> = serde_json::from_slice(&bytes)
        .map_err(|source| ConfigError::JsonParse { key: key.to_string(), source })?;
    raw_items.into_iter().map(convert_item).collect()
}

/// Resolves scaling-group configurations from the repository.
///
/// Two rows are consulted: the IaC-generated row (required — without it the
/// process has nothing to reconcile) and an operator-maintained external row
/// (optional — a broken external row is logged and skipped). The merged,
/// validated result is cached for the process lifetime.
pub struct SgConfigService {
    kv: Arc<dyn KvStore>,
    iac_key: String,
    external_key: String,
    cache: OnceCell<ScalingGroupConfigs>,
}

impl SgConfigService {
    pub fn new(kv: Arc<dyn KvStore>, db_config: &DbConfig) -> Self {
        SgConfigService {
            kv,
            iac_key: db_config.iac_config_item_key_id.clone(),
            external_key: db_config.external_config_item_key_id.clone(),
            cache: OnceCell::new(),
        }
    }

    pub async fn get_configs(&self) -> Result<ScalingGroupConfigs, ConfigError> {
        let configs = self.cache.get_or_try_init(|| self.load_all()).await?;
        Ok(configs.clone())
    }

    async fn load_all(&self) -> Result<ScalingGroupConfigs, ConfigError> {
        let mut items = self.load_row(&self.iac_key).await?;
        info!(count = items.len(), key = %self.iac_key, "loaded IaC scaling group configurations");

        if !self.external_key.is_empty() {
            match self.load_row(&self.external_key).await {
                Ok(external) => {
                    info!(
                        count = external.len(),
                        key = %self.external_key,
                        "loaded external scaling group configurations"
                    );
                    items.extend(external);
                }
                Err(err) => {
                    warn!(
                        key = %self.external_key,
                        error = %err,
                        "external scaling group configurations unavailable; continuing without them"
                    );
                }
            }
        }

        Ok(ScalingGroupConfigs { items })
    }

    async fn load_row(&self, key: &str) -> Result<Vec<ScalingGroupConfig>, ConfigError> {
        let row = self
            .kv
            .get(key)
            .await?
            .ok_or_else(|| ConfigError::MissingRow { key: key.to_string() })?;
        let payload = row
            .get("config")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ConfigError::MissingPayload { key: key.to_string() })?;
        let items = decode_config_items(key, payload)?;
        if items.is_empty() {
            return Err(ConfigError::Empty { key: key.to_string() });
        }
        debug!(key, count = items.len(), "decoded configuration row");
        Ok(items)
    }
}

// ── Raw → typed conversion ────────────────────────────────────────────────────

fn convert_item(raw: RawScalingGroupConfig) -> Result<ScalingGroupConfig, ConfigError> {
    let sg_name = raw.scaling_group_name.clone();
    let config = ScalingGroupConfig {
        dns_config: convert_dns(&sg_name, raw.dns_config)?,
        readiness_config: raw.readiness_config.map(convert_readiness),
        health_check_config: raw
            .health_check_config
            .map(|hc| convert_health_check(&sg_name, hc))
            .transpose()?,
        proceed_mode: parse_proceed_mode(&sg_name, raw.multiple_config_proceed_mode.as_deref())?,
        what_if: raw.what_if,
        scaling_group_name: raw.scaling_group_name,
    };
    config.validate()?;
    Ok(config)
}

fn convert_dns(sg_name: &str, raw: RawDnsRecordConfig) -> Result<DnsRecordConfig, ConfigError> {
    let provider = match raw.provider.to_ascii_lowercase().as_str() {
        "route53" => DnsProviderKind::Route53,
        "cloudflare" => DnsProviderKind::Cloudflare,
        "mock" => DnsProviderKind::Mock,
        other => {
            return Err(ConfigError::invalid_item(
                sg_name,
                format!("unknown dns provider '{}'", other),
            ))
        }
    };
    let record_type = DnsRecordType::parse(&raw.record_type).ok_or_else(|| {
        ConfigError::invalid_item(sg_name, format!("unknown record type '{}'", raw.record_type))
    })?;
    let mode = match raw.mode.to_ascii_uppercase().as_str() {
        "MULTIVALUE" => RecordMappingMode::Multivalue,
        "SINGLE_LATEST" => RecordMappingMode::SingleLatest,
        other => {
            return Err(ConfigError::invalid_item(
                sg_name,
                format!("unknown record mapping mode '{}'", other),
            ))
        }
    };
    let empty_mode = match raw.empty_mode.to_ascii_uppercase().as_str() {
        "KEEP" => EmptyRecordMode::Keep,
        "DELETE" => EmptyRecordMode::Delete,
        "FIXED" => EmptyRecordMode::Fixed,
        other => {
            return Err(ConfigError::invalid_item(
                sg_name,
                format!("unknown empty record mode '{}'", other),
            ))
        }
    };
    Ok(DnsRecordConfig {
        provider,
        zone_id: raw.dns_zone_id,
        record_name: raw.record_name,
        record_type,
        record_ttl: raw.record_ttl,
        mode,
        empty_mode,
        empty_mode_value: raw.empty_mode_value,
        value_source: raw.value_source.to_ascii_lowercase(),
        srv_priority: raw.srv_priority,
        srv_weight: raw.srv_weight,
        srv_port: raw.srv_port,
    })
}

fn convert_readiness(raw: RawReadinessConfig) -> ReadinessConfig {
    ReadinessConfig {
        enabled: raw.enabled,
        tag_key: raw.tag_key,
        tag_value: raw.tag_value,
        interval_secs: raw.interval_seconds,
        timeout_secs: raw.timeout_seconds,
    }
}

fn convert_health_check(
    sg_name: &str,
    raw: RawHealthCheckConfig,
) -> Result<HealthCheckConfig, ConfigError> {
    let protocol = match raw.protocol.to_ascii_uppercase().as_str() {
        "TCP" => HealthCheckProtocol::Tcp,
        "HTTP" => HealthCheckProtocol::Http,
        "HTTPS" => HealthCheckProtocol::Https,
        other => {
            return Err(ConfigError::invalid_item(
                sg_name,
                format!("unknown health check protocol '{}'", other),
            ))
        }
    };
    let mut path = raw.path;
    if raw.enabled && matches!(protocol, HealthCheckProtocol::Http | HealthCheckProtocol::Https)
        && path.is_empty()
    {
        path = "/".to_string();
    }
    Ok(HealthCheckConfig {
        enabled: raw.enabled,
        endpoint_source: raw.endpoint_source.to_ascii_lowercase(),
        protocol,
        port: raw.port,
        path,
        timeout_secs: raw.timeout_seconds,
        abandon_on_failure: raw.abandon_on_failure,
    })
}

fn parse_proceed_mode(sg_name: &str, raw: Option<&str>) -> Result<ProceedMode, ConfigError> {
    match raw {
        None => Ok(ProceedMode::AllOperational),
        Some(s) => match s.to_ascii_uppercase().as_str() {
            "ALL_OPERATIONAL" => Ok(ProceedMode::AllOperational),
            "SELF_OPERATIONAL" => Ok(ProceedMode::SelfOperational),
            "HALF_OPERATIONAL" => Ok(ProceedMode::HalfOperational),
            other => Err(ConfigError::invalid_item(
                sg_name,
                format!("unknown proceed mode '{}'", other),
            )),
        },
    }
}
