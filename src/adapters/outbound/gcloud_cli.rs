// Platform ports backed by the `gcloud` command line, parsing its JSON output.
use crate::application::gateway::PlatformClients;
use crate::common::{PlatformError, PlatformResult};
use crate::config::Config;
use crate::domains::platform::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";

pub struct GcloudCli {
    runner: Arc<dyn CommandRunner>,
    executable: String,
    timeout: Duration,
}

impl GcloudCli {
    pub fn new(runner: Arc<dyn CommandRunner>, executable: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            executable: executable.into(),
            timeout,
        }
    }

    pub fn from_config(runner: Arc<dyn CommandRunner>, config: &Config) -> Self {
        Self::new(
            runner,
            config.cli_executable.clone(),
            Duration::from_secs(config.command_timeout_secs),
        )
    }

    /// Every platform surface served by this one CLI adapter.
    pub fn into_clients(self) -> PlatformClients {
        let runner = self.runner.clone();
        let cli = Arc::new(self);
        PlatformClients {
            services: cli.clone(),
            registry: cli.clone(),
            logging: cli.clone(),
            builds: cli.clone(),
            credentials: cli.clone(),
            iam: cli.clone(),
            projects: cli,
            runner,
        }
    }

    async fn invoke(&self, program: &str, args: Vec<String>) -> PlatformResult<ProcessOutput> {
        debug!(program, ?args, "invoking platform CLI");
        Ok(self.runner.run(program, &args, self.timeout).await?)
    }

    /// Stdout of a successful call; a non-zero exit becomes an API error carrying stderr.
    async fn checked(&self, surface: &'static str, args: Vec<String>) -> PlatformResult<String> {
        let out = self.invoke(&self.executable, args).await?;
        if out.exit_code != 0 {
            return Err(PlatformError::api(surface, failure_text(&out)));
        }
        Ok(out.stdout)
    }

    async fn json<T: DeserializeOwned>(&self, surface: &'static str, args: Vec<String>) -> PlatformResult<T> {
        let stdout = self.checked(surface, args).await?;
        serde_json::from_str(&stdout).map_err(|source| PlatformError::Decode { surface, source })
    }

    /// Like `json`, but empty output means an empty list.
    async fn json_list<T: DeserializeOwned>(
        &self,
        surface: &'static str,
        args: Vec<String>,
    ) -> PlatformResult<Vec<T>> {
        let stdout = self.checked(surface, args).await?;
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&stdout).map_err(|source| PlatformError::Decode { surface, source })
    }
}

fn failure_text(out: &ProcessOutput) -> String {
    let stderr = out.stderr.trim();
    if stderr.is_empty() {
        format!("exit status {}", out.exit_code)
    } else {
        stderr.to_string()
    }
}

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// `projects/<p>/locations/<l>` -> (p, l)
fn split_parent(parent: &str) -> PlatformResult<(&str, &str)> {
    match parent.split('/').collect::<Vec<_>>().as_slice() {
        ["projects", project, "locations", location] => Ok((*project, *location)),
        _ => Err(PlatformError::api("cli", format!("malformed parent: {}", parent))),
    }
}

// --- gcloud JSON shapes -------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliService {
    metadata: CliMetadata,
    #[serde(default)]
    status: CliServiceStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliMetadata {
    name: String,
    creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliServiceStatus {
    #[serde(default)]
    conditions: Vec<CliCondition>,
    url: Option<String>,
    latest_ready_revision_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CliCondition {
    #[serde(rename = "type")]
    condition_type: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Default, Deserialize)]
struct CliDeployed {
    #[serde(default)]
    status: CliDeployStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliDeployStatus {
    latest_created_revision_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CliRepository {
    name: String,
    format: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliLogEntry {
    timestamp: Option<DateTime<Utc>>,
    severity: Option<String>,
    text_payload: Option<String>,
    resource: Option<CliMonitoredResource>,
}

#[derive(Debug, Deserialize)]
struct CliMonitoredResource {
    #[serde(rename = "type")]
    resource_type: String,
}

#[derive(Debug, Deserialize)]
struct CliBuild {
    name: Option<String>,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliServiceAccount {
    email: String,
    display_name: Option<String>,
    #[serde(default)]
    disabled: bool,
}

#[derive(Debug, Default, Deserialize)]
struct CliPolicy {
    #[serde(default)]
    bindings: Vec<CliBinding>,
}

#[derive(Debug, Deserialize)]
struct CliBinding {
    role: String,
    #[serde(default)]
    members: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliProject {
    project_id: String,
    name: Option<String>,
    project_number: Option<String>,
    lifecycle_state: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct CliBuildConfig<'a> {
    steps: &'a [BuildStep],
    images: &'a [String],
}

// --- ports --------------------------------------------------------------------

#[async_trait]
impl ServicesApi for GcloudCli {
    async fn list_services(&self, parent: &str) -> PlatformResult<Vec<PlatformService>> {
        let (project, location) = split_parent(parent)?;
        let services: Vec<CliService> = self
            .json_list(
                "run",
                args(["run", "services", "list", "--project", project, "--region", location, "--format=json"]),
            )
            .await?;
        Ok(services
            .into_iter()
            .map(|s| PlatformService {
                name: format!("{}/services/{}", parent, s.metadata.name),
                conditions: s
                    .status
                    .conditions
                    .into_iter()
                    .map(|c| ServiceCondition {
                        condition_type: c.condition_type,
                        status: c.status,
                    })
                    .collect(),
                url: s.status.url,
                latest_ready_revision: s.status.latest_ready_revision_name,
                create_time: s.metadata.creation_timestamp,
            })
            .collect())
    }

    async fn create_service(&self, parent: &str, spec: &ServiceSpec) -> PlatformResult<OperationRef> {
        let (project, location) = split_parent(parent)?;
        let port = spec.port.to_string();
        let mut cmd = args([
            "run", "deploy", spec.short_name(),
            "--image", &spec.image,
            "--port", &port,
            "--cpu", &spec.cpu,
            "--memory", &spec.memory,
            "--project", project,
            "--region", location,
            "--async", "--quiet", "--format=json",
        ]);
        if !spec.env.is_empty() {
            let pairs: Vec<String> = spec.env.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            cmd.push(format!("--set-env-vars={}", pairs.join(",")));
        }
        if let Some(min) = spec.min_instances {
            cmd.push(format!("--min-instances={}", min));
        }
        if let Some(max) = spec.max_instances {
            cmd.push(format!("--max-instances={}", max));
        }
        // `--async` prints the service as accepted; its newest revision is the handle.
        let stdout = self.checked("run", cmd).await?;
        let deployed: CliDeployed = if stdout.trim().is_empty() {
            CliDeployed::default()
        } else {
            serde_json::from_str(&stdout).map_err(|source| PlatformError::Decode { surface: "run", source })?
        };
        let name = match deployed.status.latest_created_revision_name {
            Some(revision) if !revision.is_empty() => format!("{}/revisions/{}", parent, revision),
            _ => spec.name.clone(),
        };
        Ok(OperationRef { name })
    }
}

#[async_trait]
impl RegistryApi for GcloudCli {
    async fn list_repositories(&self, parent: &str) -> PlatformResult<Vec<Repository>> {
        let (project, location) = split_parent(parent)?;
        let repos: Vec<CliRepository> = self
            .json_list(
                "artifacts",
                args(["artifacts", "repositories", "list", "--project", project, "--location", location, "--format=json"]),
            )
            .await?;
        Ok(repos
            .into_iter()
            .map(|r| Repository {
                name: r.name,
                format: r.format,
                description: r.description,
            })
            .collect())
    }

    /// Pushes through the local docker daemon; gcloud acts as its credential helper.
    async fn push_image(&self, image: &str) -> PlatformResult<()> {
        if image.is_empty() {
            return Err(PlatformError::api("docker", "no image name given"));
        }
        let out = self.invoke("docker", args(["push", image])).await?;
        if out.exit_code != 0 {
            return Err(PlatformError::api("docker", failure_text(&out)));
        }
        Ok(())
    }
}

#[async_trait]
impl LoggingApi for GcloudCli {
    async fn list_entries(&self, query: &LogQuery) -> PlatformResult<Vec<LogEntry>> {
        let mut entries = Vec::new();
        // One `logging read` per resource; the usual query names a single project.
        for resource in &query.resource_names {
            let project = resource.strip_prefix("projects/").unwrap_or(resource);
            let limit = format!("--limit={}", query.page_size);
            let batch: Vec<CliLogEntry> = self
                .json_list(
                    "logging",
                    args(["logging", "read", &query.filter, "--project", project, &limit, "--order=desc", "--format=json"]),
                )
                .await?;
            entries.extend(batch.into_iter().map(|e| LogEntry {
                timestamp: e.timestamp,
                severity: e.severity.unwrap_or_else(|| "DEFAULT".to_string()),
                text_payload: e.text_payload,
                resource_type: e.resource.map(|r| r.resource_type).unwrap_or_default(),
            }));
        }
        Ok(entries)
    }
}

#[async_trait]
impl BuildApi for GcloudCli {
    async fn create_build(&self, project_id: &str, build: &BuildSpec) -> PlatformResult<OperationRef> {
        let config = serde_json::to_string(&CliBuildConfig {
            steps: &build.steps,
            images: &build.images,
        })
        .map_err(|source| PlatformError::Decode { surface: "build", source })?;
        let file = tempfile::Builder::new()
            .prefix("cloudbuild-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| PlatformError::api("build", e.to_string()))?;
        tokio::fs::write(file.path(), config)
            .await
            .map_err(|e| PlatformError::api("build", e.to_string()))?;

        let source = format!("gs://{}/{}", build.bucket, build.object);
        let config_path = file.path().display().to_string();
        let created: CliBuild = self
            .json(
                "build",
                args(["builds", "submit", &source, "--config", &config_path, "--project", project_id, "--async", "--format=json"]),
            )
            .await?;
        let name = match (created.name, created.id) {
            (Some(name), _) => name,
            (None, Some(id)) => format!("projects/{}/builds/{}", project_id, id),
            (None, None) => return Err(PlatformError::api("build", "response carried no build id")),
        };
        Ok(OperationRef { name })
    }
}

#[async_trait]
impl CredentialsApi for GcloudCli {
    async fn resolve_default(&self) -> PlatformResult<Credentials> {
        let token = self
            .invoke(&self.executable, args(["auth", "application-default", "print-access-token"]))
            .await?;
        if token.exit_code != 0 {
            return Err(PlatformError::CredentialsUnavailable(failure_text(&token)));
        }

        if let Ok(project) = std::env::var(PROJECT_ENV) {
            if !project.is_empty() {
                return Ok(Credentials { project: Some(project) });
            }
        }
        let out = self
            .invoke(&self.executable, args(["config", "get-value", "project"]))
            .await?;
        let project = out.stdout.trim();
        let project = (out.exit_code == 0 && !project.is_empty() && project != "(unset)")
            .then(|| project.to_string());
        Ok(Credentials { project })
    }
}

#[async_trait]
impl IamApi for GcloudCli {
    async fn list_service_accounts(&self, project_id: &str) -> PlatformResult<Vec<ServiceAccount>> {
        let accounts: Vec<CliServiceAccount> = self
            .json_list(
                "iam",
                args(["iam", "service-accounts", "list", "--project", project_id, "--format=json"]),
            )
            .await?;
        Ok(accounts
            .into_iter()
            .map(|a| ServiceAccount {
                email: a.email,
                display_name: a.display_name,
                disabled: a.disabled,
            })
            .collect())
    }

    async fn get_policy(&self, project_id: &str) -> PlatformResult<Vec<PolicyBinding>> {
        let policy: CliPolicy = self
            .json("iam", args(["projects", "get-iam-policy", project_id, "--format=json"]))
            .await?;
        Ok(policy
            .bindings
            .into_iter()
            .map(|b| PolicyBinding {
                role: b.role,
                members: b.members,
            })
            .collect())
    }

    async fn add_binding(&self, project_id: &str, role: &str, member: &str) -> PlatformResult<()> {
        let member = format!("--member={}", member);
        let role = format!("--role={}", role);
        self.checked(
            "iam",
            args(["projects", "add-iam-policy-binding", project_id, &member, &role, "--format=json"]),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ProjectsApi for GcloudCli {
    async fn list_projects(&self) -> PlatformResult<Vec<Project>> {
        let projects: Vec<CliProject> = self
            .json_list("projects", args(["projects", "list", "--format=json"]))
            .await?;
        Ok(projects
            .into_iter()
            .map(|p| Project {
                name: p
                    .project_number
                    .map(|n| format!("projects/{}", n))
                    .unwrap_or_else(|| format!("projects/{}", p.project_id)),
                display_name: p.name.unwrap_or_default(),
                state: p.lifecycle_state.unwrap_or_else(|| "STATE_UNSPECIFIED".to_string()),
                project_id: p.project_id,
            })
            .collect())
    }
}
