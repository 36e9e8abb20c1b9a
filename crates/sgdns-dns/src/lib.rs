pub mod command;
pub mod error;
pub mod mock;
pub mod plan;
pub mod provider;
pub mod request;
pub mod route53;

pub use command::{DnsChangeAction, DnsChangeCommand, DnsValue};
pub use error::ProviderError;
pub use mock::MockProvider;
pub use plan::ChangePlanner;
pub use provider::{DnsProvider, ProviderRegistry};
pub use request::{
    DnsChangeRequest, DnsChangeRequestAction, DnsChangeResponse, ResourceRecordSet,
};
pub use route53::{Route53Api, Route53Provider};
