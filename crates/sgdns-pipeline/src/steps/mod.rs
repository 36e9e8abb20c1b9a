use async_trait::async_trait;

use crate::context::SglContext;
use crate::error::PipelineError;

mod apply;
mod health;
mod init;
mod metadata;
mod plan;
mod readiness;

pub use apply::ApplyDnsChangesStep;
pub use health::HealthChecksStep;
pub use init::InitStep;
pub use metadata::LoadMetadataStep;
pub use plan::PlanDnsChangesStep;
pub use readiness::ReadinessChecksStep;

/// One stage of the lifecycle pipeline. Stages run in declared order, each
/// mutating the shared context; an error aborts the invocation.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, ctx: &mut SglContext) -> Result<(), PipelineError>;
}
