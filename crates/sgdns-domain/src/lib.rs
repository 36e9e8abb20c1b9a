pub mod error;
pub mod event;
pub mod instance;
pub mod result;
pub mod value_source;

mod tests;

pub use error::DomainError;
pub use event::{LifecycleEvent, LifecycleTransition};
pub use instance::{Instance, InstanceMetadata, InstanceTag, ScalingGroup, case_fold};
pub use result::{HealthCheckResult, MetadataResult, ReadinessResult};
pub use value_source::{IpVersion, ValueSource, Visibility};
