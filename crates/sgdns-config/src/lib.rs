mod raw;

pub mod env;
pub mod error;
pub mod loader;
pub mod models;

pub use env::{
    BrokerConfig, DbConfig, EnvironmentConfig, MetricsConfig, ReconciliationConfig,
};
pub use error::ConfigError;
pub use loader::{decode_config_items, SgConfigService};
pub use models::{
    DnsProviderKind, DnsRecordConfig, DnsRecordType, EmptyRecordMode, HealthCheckConfig,
    HealthCheckProtocol, ProceedMode, ReadinessConfig, RecordMappingMode, ScalingGroupConfig,
    ScalingGroupConfigs,
};
