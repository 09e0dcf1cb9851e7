// Caller-facing request shapes. Missing fields fall back to the documented defaults.
use super::resources::{BuildSpec, ServiceSpec};
use crate::catalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_SERVICE_NAME: &str = "new-service";
pub const DEFAULT_IMAGE: &str = "gcr.io/project/image";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SOURCE_OBJECT: &str = "source.tar.gz";
pub const DEFAULT_LOG_FILTER: &str = "resource.type=cloud_run_revision";
pub const DEFAULT_ROLE: &str = "roles/viewer";
pub const DEFAULT_MEMBER: &str = "user:example@example.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub image: String,
    pub port: u16,
    pub cpu: String,
    pub memory: String,
    pub env: BTreeMap<String, String>,
    pub min_instances: Option<u32>,
    pub max_instances: Option<u32>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVICE_NAME.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            port: DEFAULT_PORT,
            cpu: "1000m".to_string(),
            memory: "512Mi".to_string(),
            env: BTreeMap::new(),
            min_instances: None,
            max_instances: None,
        }
    }
}

impl ServiceConfig {
    pub fn into_spec(self, parent: &str) -> ServiceSpec {
        ServiceSpec {
            name: format!("{}/services/{}", parent, self.name),
            image: self.image,
            port: self.port,
            cpu: self.cpu,
            memory: self.memory,
            env: self.env,
            min_instances: self.min_instances,
            max_instances: self.max_instances,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Falls back to the configured build bucket.
    pub bucket: Option<String>,
    pub object: String,
    pub image_name: String,
    /// Key into the build template catalog; `docker` when absent.
    pub template: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            object: DEFAULT_SOURCE_OBJECT.to_string(),
            image_name: DEFAULT_IMAGE.to_string(),
            template: None,
        }
    }
}

impl BuildConfig {
    pub fn into_spec(self, default_bucket: &str) -> Result<BuildSpec, String> {
        let template = self
            .template
            .as_deref()
            .unwrap_or(catalog::DEFAULT_BUILD_TEMPLATE);
        let steps = catalog::build_steps(template, &self.image_name)
            .ok_or_else(|| format!("Unknown build template: {}", template))?;
        Ok(BuildSpec {
            bucket: self.bucket.unwrap_or_else(|| default_bucket.to_string()),
            object: self.object,
            steps,
            images: vec![self.image_name],
        })
    }
}
