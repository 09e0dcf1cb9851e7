use crate::common::*;
use crate::config::ConfigStore;
use crate::domains::platform::*;
use crate::domains::DynLogger;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The external surfaces the gateway talks to.
#[derive(Clone)]
pub struct PlatformClients {
    pub services: Arc<dyn ServicesApi>,
    pub registry: Arc<dyn RegistryApi>,
    pub logging: Arc<dyn LoggingApi>,
    pub builds: Arc<dyn BuildApi>,
    pub credentials: Arc<dyn CredentialsApi>,
    pub iam: Arc<dyn IamApi>,
    pub projects: Arc<dyn ProjectsApi>,
    pub runner: Arc<dyn CommandRunner>,
}

/// Stateless facade: one intent, one platform call, one normalized envelope.
///
/// No method returns an error or panics on a platform fault. Every failure comes
/// back as `ok == false` with the fault's description and an empty payload.
pub struct OperationGateway {
    config: Arc<ConfigStore>,
    clients: PlatformClients,
    logger: DynLogger,
}

impl OperationGateway {
    pub fn new(config: Arc<ConfigStore>, clients: PlatformClients, logger: DynLogger) -> Self {
        Self {
            config,
            clients,
            logger,
        }
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    fn parent(&self) -> String {
        format!(
            "projects/{}/locations/{}",
            self.config.project_id(),
            self.config.location()
        )
    }

    fn capture(&self, kind: ResultKind, result: PlatformResult<Vec<Record>>) -> ResultEnvelope {
        match result {
            Ok(payload) => {
                debug!(kind = %kind, records = payload.len(), "platform call succeeded");
                ResultEnvelope::success(kind, payload)
            }
            Err(e) => {
                warn!(kind = %kind, error = %e, "platform call failed");
                self.logger.warn(&format!("{} failed: {}", kind, e));
                ResultEnvelope::failure(kind, e)
            }
        }
    }

    pub async fn list_services(&self) -> ResultEnvelope {
        let result = self
            .clients
            .services
            .list_services(&self.parent())
            .await
            .map(|services| services.into_iter().map(normalize_service).collect());
        self.capture(ResultKind::Services, result)
    }

    pub async fn create_service(&self, service: ServiceConfig) -> ResultEnvelope {
        let parent = self.parent();
        let spec = service.into_spec(&parent);
        info!(service = %spec.name, image = %spec.image, "creating service");
        let result = self
            .clients
            .services
            .create_service(&parent, &spec)
            .await
            .map(|op| vec![operation_record(op)]);
        self.capture(ResultKind::ServiceCreated, result)
    }

    pub async fn list_images(&self) -> ResultEnvelope {
        let result = self
            .clients
            .registry
            .list_repositories(&self.parent())
            .await
            .map(|repos| repos.into_iter().map(normalize_repository).collect());
        self.capture(ResultKind::Images, result)
    }

    pub async fn list_logs(&self, filter: &str) -> ResultEnvelope {
        let config = self.config.snapshot();
        let query = LogQuery {
            resource_names: vec![format!("projects/{}", config.project_id)],
            filter: filter.to_string(),
            page_size: config.max_log_entries,
        };
        let result = self
            .clients
            .logging
            .list_entries(&query)
            .await
            .map(|entries| entries.into_iter().map(normalize_log_entry).collect());
        self.capture(ResultKind::Logs, result)
    }

    pub async fn start_build(&self, build: BuildConfig) -> ResultEnvelope {
        let config = self.config.snapshot();
        let spec = match build.into_spec(&config.build_bucket) {
            Ok(spec) => spec,
            Err(reason) => {
                return self.capture(
                    ResultKind::BuildStarted,
                    Err(PlatformError::api("build", reason)),
                )
            }
        };
        info!(bucket = %spec.bucket, object = %spec.object, "starting build");
        let result = self
            .clients
            .builds
            .create_build(&config.project_id, &spec)
            .await
            .map(|op| vec![operation_record(op)]);
        self.capture(ResultKind::BuildStarted, result)
    }

    pub async fn push_image(&self, image: &str) -> ResultEnvelope {
        let result = self.clients.registry.push_image(image).await.map(|()| {
            vec![message_record("Image pushed successfully")]
        });
        self.capture(ResultKind::PushCompleted, result)
    }

    pub async fn list_service_accounts(&self) -> ResultEnvelope {
        let result = self
            .clients
            .iam
            .list_service_accounts(&self.config.project_id())
            .await
            .map(|accounts| {
                accounts
                    .into_iter()
                    .map(|a| {
                        Record::ServiceAccount(ServiceAccountRecord {
                            display_name: a.display_name.unwrap_or_default(),
                            email: a.email,
                            disabled: a.disabled,
                        })
                    })
                    .collect()
            });
        self.capture(ResultKind::ServiceAccounts, result)
    }

    pub async fn list_permissions(&self) -> ResultEnvelope {
        let result = self
            .clients
            .iam
            .get_policy(&self.config.project_id())
            .await
            .map(|bindings| {
                bindings
                    .into_iter()
                    .map(|b| {
                        Record::Binding(BindingRecord {
                            role: b.role,
                            members: b.members,
                        })
                    })
                    .collect()
            });
        self.capture(ResultKind::Permissions, result)
    }

    pub async fn add_permission(&self, role: &str, member: &str) -> ResultEnvelope {
        info!(role, member, "adding IAM binding");
        let result = self
            .clients
            .iam
            .add_binding(&self.config.project_id(), role, member)
            .await
            .map(|()| vec![message_record(&format!("Added {} to {}", role, member))]);
        self.capture(ResultKind::PermissionAdded, result)
    }

    pub async fn list_projects(&self) -> ResultEnvelope {
        let result = self.clients.projects.list_projects().await.map(|projects| {
            projects
                .into_iter()
                .map(|p| {
                    Record::Project(ProjectRecord {
                        project_id: p.project_id,
                        name: p.name,
                        display_name: p.display_name,
                        state: p.state,
                    })
                })
                .collect()
        });
        self.capture(ResultKind::Projects, result)
    }

    /// Resolves default credentials afresh; nothing is cached.
    pub async fn check_auth(&self) -> AuthStatus {
        match self.clients.credentials.resolve_default().await {
            Ok(Credentials {
                project: Some(project),
            }) if !project.is_empty() => AuthStatus {
                authenticated: true,
                project: Some(project),
                error: None,
            },
            Ok(_) => AuthStatus {
                authenticated: false,
                project: None,
                error: Some("No default project set".to_string()),
            },
            Err(e) => {
                self.logger.warn(&format!("credential check failed: {}", e));
                AuthStatus {
                    authenticated: false,
                    project: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Runs the platform CLI with `args`, bounded by the configured timeout.
    pub async fn run_raw_command(&self, args: &[String]) -> CommandOutcome {
        let config = self.config.snapshot();
        let timeout = Duration::from_secs(config.command_timeout_secs);
        debug!(program = %config.cli_executable, ?args, "running platform CLI");

        match self
            .clients
            .runner
            .run(&config.cli_executable, args, timeout)
            .await
        {
            Ok(out) if out.exit_code == 0 => CommandOutcome {
                ok: true,
                exit_code: 0,
                stdout: out.stdout,
                stderr: out.stderr,
                error: None,
            },
            Ok(out) => CommandOutcome {
                ok: false,
                error: Some(format!(
                    "Command '{} {}' returned non-zero exit status {}",
                    config.cli_executable,
                    args.join(" "),
                    out.exit_code
                )),
                exit_code: out.exit_code,
                stdout: out.stdout,
                stderr: out.stderr,
            },
            Err(e) => {
                self.logger.warn(&format!("platform CLI unavailable: {}", e));
                CommandOutcome {
                    ok: false,
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: String::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

fn normalize_service(service: PlatformService) -> Record {
    Record::Service(ServiceRecord {
        status: service
            .conditions
            .last()
            .map(|c| c.condition_type.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        url: service.url.unwrap_or_default(),
        revision: service.latest_ready_revision.unwrap_or_default(),
        created: service
            .create_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "Unknown".to_string()),
        name: service.name,
    })
}

fn normalize_repository(repo: Repository) -> Record {
    Record::Image(ImageRecord {
        name: repo.name,
        format: repo
            .format
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| "DOCKER".to_string()),
        description: repo
            .description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "No description".to_string()),
    })
}

fn normalize_log_entry(entry: LogEntry) -> Record {
    Record::Log(LogRecord {
        timestamp: entry
            .timestamp
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "Unknown".to_string()),
        severity: entry.severity,
        text: entry
            .text_payload
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "No payload".to_string()),
        resource_type: entry.resource_type,
    })
}

fn operation_record(op: OperationRef) -> Record {
    Record::Operation(OperationHandle { operation: op.name })
}

fn message_record(message: &str) -> Record {
    Record::Message(MessageRecord {
        message: message.to_string(),
    })
}
