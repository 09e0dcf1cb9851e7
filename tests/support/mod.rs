#![allow(dead_code)]

use async_trait::async_trait;
use gcloud_console::domains::logger::{DomainLogger, LogLevel};
use gcloud_console::domains::platform::*;
use gcloud_console::{
    CommandError, Config, ConfigStore, OperationGateway, PlatformClients, PlatformError,
    PlatformResult,
};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::Duration;

pub const PROJECT: &str = "acme-project";
pub const LOCATION: &str = "us-central1";

pub struct BridgeCapture {
    pub messages: Arc<Mutex<Vec<String>>>,
}

impl BridgeCapture {
    pub fn new() -> Self {
        Self { messages: Arc::new(Mutex::new(Vec::new())) }
    }
}

impl DomainLogger for BridgeCapture {
    fn log(&self, level: LogLevel, msg: &str) {
        self.messages.lock().unwrap().push(format!("{}:{}", level, msg));
    }
}

/// In-memory stand-in for every platform surface.
#[derive(Default)]
pub struct MockPlatform {
    pub services: Vec<PlatformService>,
    pub repositories: Vec<Repository>,
    pub log_entries: Vec<LogEntry>,
    pub service_accounts: Vec<ServiceAccount>,
    pub bindings: Vec<PolicyBinding>,
    pub projects: Vec<Project>,
    /// `None` means no credentials resolve.
    pub credentials: Option<Credentials>,
    /// Every surface fails with this API message.
    pub fail_with: Option<String>,
    /// Every surface panics with this message.
    pub panic_with: Option<String>,
    pub delay: Option<Duration>,

    pub calls: Mutex<Vec<String>>,
    pub threads: Mutex<Vec<ThreadId>>,
    pub last_parent: Mutex<Option<String>>,
    pub last_log_query: Mutex<Option<LogQuery>>,
    pub last_service: Mutex<Option<ServiceSpec>>,
    pub last_build: Mutex<Option<(String, BuildSpec)>>,
    pub last_binding: Mutex<Option<(String, String, String)>>,
    pub pushed: Mutex<Vec<String>>,
}

impl MockPlatform {
    pub fn failing(message: &str) -> Self {
        Self { fail_with: Some(message.to_string()), ..Self::default() }
    }

    pub fn panicking(message: &str) -> Self {
        Self { panic_with: Some(message.to_string()), ..Self::default() }
    }

    pub fn api_error(message: &str) -> String {
        PlatformError::api("mock", message).to_string()
    }

    async fn gate(&self, call: &str) -> PlatformResult<()> {
        self.calls.lock().unwrap().push(call.to_string());
        self.threads.lock().unwrap().push(std::thread::current().id());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(msg) = &self.panic_with {
            panic!("{}", msg);
        }
        match &self.fail_with {
            Some(msg) => Err(PlatformError::api("mock", msg.clone())),
            None => Ok(()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ServicesApi for MockPlatform {
    async fn list_services(&self, parent: &str) -> PlatformResult<Vec<PlatformService>> {
        self.gate("list_services").await?;
        *self.last_parent.lock().unwrap() = Some(parent.to_string());
        Ok(self.services.clone())
    }

    async fn create_service(&self, parent: &str, spec: &ServiceSpec) -> PlatformResult<OperationRef> {
        self.gate("create_service").await?;
        *self.last_parent.lock().unwrap() = Some(parent.to_string());
        *self.last_service.lock().unwrap() = Some(spec.clone());
        Ok(OperationRef { name: format!("{}/operations/op-1", parent) })
    }
}

#[async_trait]
impl RegistryApi for MockPlatform {
    async fn list_repositories(&self, parent: &str) -> PlatformResult<Vec<Repository>> {
        self.gate("list_repositories").await?;
        *self.last_parent.lock().unwrap() = Some(parent.to_string());
        Ok(self.repositories.clone())
    }

    async fn push_image(&self, image: &str) -> PlatformResult<()> {
        self.gate("push_image").await?;
        self.pushed.lock().unwrap().push(image.to_string());
        Ok(())
    }
}

#[async_trait]
impl LoggingApi for MockPlatform {
    async fn list_entries(&self, query: &LogQuery) -> PlatformResult<Vec<LogEntry>> {
        self.gate("list_entries").await?;
        *self.last_log_query.lock().unwrap() = Some(query.clone());
        Ok(self.log_entries.clone())
    }
}

#[async_trait]
impl BuildApi for MockPlatform {
    async fn create_build(&self, project_id: &str, build: &BuildSpec) -> PlatformResult<OperationRef> {
        self.gate("create_build").await?;
        *self.last_build.lock().unwrap() = Some((project_id.to_string(), build.clone()));
        Ok(OperationRef { name: format!("projects/{}/builds/b-1", project_id) })
    }
}

#[async_trait]
impl CredentialsApi for MockPlatform {
    async fn resolve_default(&self) -> PlatformResult<Credentials> {
        self.gate("resolve_default").await?;
        self.credentials
            .clone()
            .ok_or_else(|| PlatformError::CredentialsUnavailable("no application default credentials".into()))
    }
}

#[async_trait]
impl IamApi for MockPlatform {
    async fn list_service_accounts(&self, _project_id: &str) -> PlatformResult<Vec<ServiceAccount>> {
        self.gate("list_service_accounts").await?;
        Ok(self.service_accounts.clone())
    }

    async fn get_policy(&self, _project_id: &str) -> PlatformResult<Vec<PolicyBinding>> {
        self.gate("get_policy").await?;
        Ok(self.bindings.clone())
    }

    async fn add_binding(&self, project_id: &str, role: &str, member: &str) -> PlatformResult<()> {
        self.gate("add_binding").await?;
        *self.last_binding.lock().unwrap() =
            Some((project_id.to_string(), role.to_string(), member.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ProjectsApi for MockPlatform {
    async fn list_projects(&self) -> PlatformResult<Vec<Project>> {
        self.gate("list_projects").await?;
        Ok(self.projects.clone())
    }
}

/// Command runner returning one fixed reply.
pub struct MockRunner {
    pub reply: Result<ProcessOutput, CommandError>,
    pub calls: Mutex<Vec<(String, Vec<String>, Duration)>>,
}

impl MockRunner {
    pub fn exiting(code: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            reply: Ok(ProcessOutput {
                exit_code: code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: CommandError) -> Self {
        Self { reply: Err(err), calls: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<ProcessOutput, CommandError> {
        self.calls.lock().unwrap().push((program.to_string(), args.to_vec(), timeout));
        self.reply.clone()
    }
}

pub fn clients(platform: Arc<MockPlatform>, runner: Arc<MockRunner>) -> PlatformClients {
    PlatformClients {
        services: platform.clone(),
        registry: platform.clone(),
        logging: platform.clone(),
        builds: platform.clone(),
        credentials: platform.clone(),
        iam: platform.clone(),
        projects: platform,
        runner,
    }
}

pub fn store() -> Arc<ConfigStore> {
    Arc::new(ConfigStore::new(Config {
        project_id: PROJECT.to_string(),
        location: LOCATION.to_string(),
        build_bucket: "acme-builds".to_string(),
        max_log_entries: 50,
        ..Config::default()
    }))
}

pub fn gateway_with(
    platform: Arc<MockPlatform>,
    runner: Arc<MockRunner>,
    logger: Arc<dyn DomainLogger>,
) -> OperationGateway {
    OperationGateway::new(store(), clients(platform, runner), logger)
}

pub fn gateway(platform: Arc<MockPlatform>) -> OperationGateway {
    gateway_with(
        platform,
        Arc::new(MockRunner::exiting(0, "", "")),
        gcloud_console::adapters::outbound::init_noop_logger(),
    )
}

pub fn service(name: &str, status: &str) -> PlatformService {
    PlatformService {
        name: format!("projects/{}/locations/{}/services/{}", PROJECT, LOCATION, name),
        conditions: vec![ServiceCondition {
            condition_type: status.to_string(),
            status: "True".to_string(),
        }],
        url: Some(format!("https://{}.run.app", name)),
        latest_ready_revision: Some(format!("{}-00001", name)),
        create_time: None,
    }
}
