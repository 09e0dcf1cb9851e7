use super::resources::*;
use crate::common::{CommandError, PlatformResult};
use async_trait::async_trait;
use std::time::Duration;

// Ports the gateway depends on, one per platform surface.
// Every call is a single request/response round trip; adapters never retry.

#[async_trait]
pub trait ServicesApi: Send + Sync {
    /// `parent` is `projects/<p>/locations/<l>`.
    async fn list_services(&self, parent: &str) -> PlatformResult<Vec<PlatformService>>;
    async fn create_service(&self, parent: &str, spec: &ServiceSpec) -> PlatformResult<OperationRef>;
}

#[async_trait]
pub trait RegistryApi: Send + Sync {
    async fn list_repositories(&self, parent: &str) -> PlatformResult<Vec<Repository>>;
    async fn push_image(&self, image: &str) -> PlatformResult<()>;
}

#[async_trait]
pub trait LoggingApi: Send + Sync {
    async fn list_entries(&self, query: &LogQuery) -> PlatformResult<Vec<LogEntry>>;
}

#[async_trait]
pub trait BuildApi: Send + Sync {
    async fn create_build(&self, project_id: &str, build: &BuildSpec) -> PlatformResult<OperationRef>;
}

#[async_trait]
pub trait CredentialsApi: Send + Sync {
    /// Fails with `PlatformError::CredentialsUnavailable` when nothing resolves.
    async fn resolve_default(&self) -> PlatformResult<Credentials>;
}

#[async_trait]
pub trait IamApi: Send + Sync {
    async fn list_service_accounts(&self, project_id: &str) -> PlatformResult<Vec<ServiceAccount>>;
    async fn get_policy(&self, project_id: &str) -> PlatformResult<Vec<PolicyBinding>>;
    async fn add_binding(&self, project_id: &str, role: &str, member: &str) -> PlatformResult<()>;
}

#[async_trait]
pub trait ProjectsApi: Send + Sync {
    async fn list_projects(&self) -> PlatformResult<Vec<Project>>;
}

/// Runs an external executable and captures its output.
/// A non-zero exit is reported in `ProcessOutput`, not as an error.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, CommandError>;
}
