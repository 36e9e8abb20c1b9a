pub mod discovery;
pub mod error;
pub mod health;
pub mod readiness;

pub use discovery::{InMemoryDiscovery, InstanceDiscovery};
pub use error::ProbeError;
pub use health::{HealthCheck, NetworkHealthChecker};
pub use readiness::{AwaitingReadinessProbe, ReadinessProbe, TagReadinessProbe};
