use std::str::FromStr;

use crate::error::ConfigError;
use crate::models::ReadinessConfig;

/// Upper bound on the probe/applier worker pool, regardless of environment.
pub const THREAD_POOL_HARD_LIMIT: usize = 1023;

// ── Sections ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub provider: String,
    pub table_name: String,
    pub iac_config_item_key_id: String,
    pub external_config_item_key_id: String,
}

#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    pub what_if: bool,
    pub max_concurrency: usize,
    /// Scaling-group membership states an instance must be in to count
    /// during a reconciliation sweep.
    pub valid_states: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub provider: String,
    pub namespace: String,
    pub alarms_enabled: bool,
    pub alarms_notification_destination: String,
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub broker: String,
    pub url: String,
}

/// Immutable process configuration, decoded from the environment once at
/// startup and threaded through construction.
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub cloud_provider: String,
    pub db: DbConfig,
    /// Fallback readiness configuration for items that declare none.
    pub readiness_defaults: ReadinessConfig,
    pub reconciliation: ReconciliationConfig,
    pub metrics: MetricsConfig,
    pub broker: BrokerConfig,
    pub thread_pool_size: usize,
}

impl EnvironmentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let thread_pool_size: usize = env_parse("THREAD_POOL_SIZE", 1000)?;
        Ok(EnvironmentConfig {
            cloud_provider: env_string("cloud_provider", "aws"),
            db: DbConfig {
                provider: env_string("db_provider", "dynamodb"),
                table_name: env_string("db_table_name", ""),
                iac_config_item_key_id: env_string("db_config_iac_item_key_id", ""),
                external_config_item_key_id: env_string("db_config_external_item_key_id", ""),
            },
            readiness_defaults: ReadinessConfig {
                enabled: env_bool("ec2_readiness_enabled", true)?,
                interval_secs: env_parse("ec2_readiness_interval_seconds", 5)?,
                timeout_secs: env_parse("ec2_readiness_timeout_seconds", 300)?,
                tag_key: env_string("ec2_readiness_tag_key", "app:code-deploy:status"),
                tag_value: env_string("ec2_readiness_tag_value", "success"),
            },
            reconciliation: ReconciliationConfig {
                what_if: env_bool("reconciliation_what_if", false)?,
                max_concurrency: env_parse("reconciliation_max_concurrency", 1)?,
                valid_states: env_list("reconciliation_scaling_group_valid_states", "InService"),
            },
            metrics: MetricsConfig {
                enabled: env_bool("monitoring_metrics_enabled", false)?,
                provider: env_string("monitoring_metrics_provider", "cloudwatch"),
                namespace: env_string("monitoring_metrics_namespace", ""),
                alarms_enabled: env_bool("monitoring_alarms_enabled", false)?,
                alarms_notification_destination: env_string(
                    "monitoring_alarms_notification_destination",
                    "",
                ),
            },
            broker: BrokerConfig {
                broker: env_string("message_broker", ""),
                url: env_string("message_broker_url", ""),
            },
            thread_pool_size: thread_pool_size.min(THREAD_POOL_HARD_LIMIT),
        })
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn env_string(var: &str, default: &str) -> String {
    match std::env::var(var) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn env_parse<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(v) if !v.is_empty() => v.parse::<T>().map_err(|e| ConfigError::Environment {
            var: var.to_string(),
            message: e.to_string(),
        }),
        _ => Ok(default),
    }
}

fn env_bool(var: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.is_empty() => match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::Environment {
                var: var.to_string(),
                message: format!("expected boolean, got '{}'", other),
            }),
        },
        _ => Ok(default),
    }
}

fn env_list(var: &str, default: &str) -> Vec<String> {
    let raw = env_string(var, default);
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
