// Resource shapes exchanged with the platform surfaces, before normalization.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCondition {
    pub condition_type: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlatformService {
    pub name: String,
    pub conditions: Vec<ServiceCondition>,
    pub url: Option<String>,
    pub latest_ready_revision: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Repository {
    pub name: String,
    pub format: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogEntry {
    pub timestamp: Option<DateTime<Utc>>,
    pub severity: String,
    pub text_payload: Option<String>,
    pub resource_type: String,
}

/// Log query, always newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub resource_names: Vec<String>,
    pub filter: String,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub project: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceAccount {
    pub email: String,
    pub display_name: Option<String>,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyBinding {
    pub role: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Project {
    pub project_id: String,
    pub name: String,
    pub display_name: String,
    pub state: String,
}

/// Handle of work started on the platform. For builds this is the build resource.
/// For service deploys it is the newest revision
/// (`projects/<p>/locations/<l>/revisions/<r>`), or the service name itself when
/// the deploy output carried no revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Fully resolved service creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// `projects/<p>/locations/<l>/services/<name>`
    pub name: String,
    pub image: String,
    pub port: u16,
    pub cpu: String,
    pub memory: String,
    pub env: BTreeMap<String, String>,
    pub min_instances: Option<u32>,
    pub max_instances: Option<u32>,
}

impl ServiceSpec {
    pub fn short_name(&self) -> &str {
        crate::common::format::resource_name(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    pub name: String,
    pub args: Vec<String>,
}

/// Fully resolved build request: sources from a storage object, pushes `images`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub bucket: String,
    pub object: String,
    pub steps: Vec<BuildStep>,
    pub images: Vec<String>,
}
