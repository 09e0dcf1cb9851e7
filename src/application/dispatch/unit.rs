use super::mailbox::CompletionSink;
use super::request::{Operation, OperationRequest};
use crate::application::gateway::OperationGateway;
use crate::common::*;
use crate::domains::platform::{BuildConfig, ServiceConfig};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UnitId(Uuid);

impl UnitId {
    fn new() -> Self {
        UnitId(Uuid::new_v4())
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `Created -> Running -> Completed`. `Aborted` is only ever set by the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Created,
    Running,
    Completed,
    Aborted,
}

const CREATED: u8 = 0;
const RUNNING: u8 = 1;
const COMPLETED: u8 = 2;
const ABORTED: u8 = 3;

impl UnitState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            CREATED => UnitState::Created,
            RUNNING => UnitState::Running,
            COMPLETED => UnitState::Completed,
            _ => UnitState::Aborted,
        }
    }
}

/// What a successful unit hands back. Most operations produce an envelope;
/// the credential check and raw CLI calls have their own shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UnitOutput {
    Envelope(ResultEnvelope),
    Auth(AuthStatus),
    Command(CommandOutcome),
}

impl UnitOutput {
    pub fn into_envelope(self) -> Option<ResultEnvelope> {
        match self {
            UnitOutput::Envelope(env) => Some(env),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded(UnitOutput),
    Failed(String),
}

/// Message delivered on the consumer's mailbox when a unit finishes.
#[derive(Debug, Clone)]
pub struct Completion {
    pub unit_id: UnitId,
    pub operation: String,
    pub outcome: Outcome,
}

/// Maps one request onto one gateway call. Usable without any task machinery.
pub async fn execute(
    request: &OperationRequest,
    gateway: &OperationGateway,
) -> DispatchResult<UnitOutput> {
    let output = match request.resolve()? {
        Operation::GetServices => UnitOutput::Envelope(gateway.list_services().await),
        Operation::CreateService => {
            let config: ServiceConfig = request.typed_param("service_config")?;
            UnitOutput::Envelope(gateway.create_service(config).await)
        }
        Operation::GetImages => UnitOutput::Envelope(gateway.list_images().await),
        Operation::GetLogs => UnitOutput::Envelope(gateway.list_logs(&request.filter()?).await),
        Operation::BuildImage => {
            let config: BuildConfig = request.typed_param("build_config")?;
            UnitOutput::Envelope(gateway.start_build(config).await)
        }
        Operation::PushImage => {
            let image = request.string_param("image_name", "")?;
            UnitOutput::Envelope(gateway.push_image(&image).await)
        }
        Operation::GetServiceAccounts => {
            UnitOutput::Envelope(gateway.list_service_accounts().await)
        }
        Operation::GetPermissions => UnitOutput::Envelope(gateway.list_permissions().await),
        Operation::AddPermission => {
            let (role, member) = (request.role()?, request.member()?);
            UnitOutput::Envelope(gateway.add_permission(&role, &member).await)
        }
        Operation::GetProjects => UnitOutput::Envelope(gateway.list_projects().await),
        Operation::CheckAuth => UnitOutput::Auth(gateway.check_auth().await),
        Operation::RunCommand => {
            let args: Vec<String> = request.typed_param("args")?;
            UnitOutput::Command(gateway.run_raw_command(&args).await)
        }
    };
    Ok(output)
}

/// One-shot task wrapping a single gateway call.
///
/// The outcome is sent exactly once to the [`CompletionSink`] given to `start`;
/// the consumer reads it from its own context. A unit is never restarted.
pub struct DispatchUnit {
    id: UnitId,
    operation: String,
    request: Option<OperationRequest>,
    gateway: Arc<OperationGateway>,
    state: Arc<AtomicU8>,
    handle: Option<JoinHandle<()>>,
}

impl DispatchUnit {
    pub fn new(request: OperationRequest, gateway: Arc<OperationGateway>) -> Self {
        Self {
            id: UnitId::new(),
            operation: request.operation().to_string(),
            request: Some(request),
            gateway,
            state: Arc::new(AtomicU8::new(CREATED)),
            handle: None,
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn state(&self) -> UnitState {
        UnitState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == UnitState::Running
    }

    /// Spawns the worker on `runtime`.
    ///
    /// # Panics
    ///
    /// Starting the same unit twice is a programming error and panics.
    pub fn start(&mut self, runtime: &Handle, sink: CompletionSink) {
        let request = match self.request.take() {
            Some(request) => request,
            None => panic!("dispatch unit {} started twice", self.id),
        };
        self.state.store(RUNNING, Ordering::Release);
        debug!(unit = %self.id, operation = %self.operation, "dispatch unit started");

        let id = self.id;
        let gateway = self.gateway.clone();
        let state = self.state.clone();
        self.handle = Some(runtime.spawn(async move {
            let operation = request.operation().to_string();
            let outcome = match AssertUnwindSafe(execute(&request, &gateway))
                .catch_unwind()
                .await
            {
                Ok(Ok(output)) => Outcome::Succeeded(output),
                Ok(Err(e)) => Outcome::Failed(e.to_string()),
                Err(panic) => {
                    Outcome::Failed(DispatchError::WorkerPanicked(panic_message(&*panic)).to_string())
                }
            };
            if let Outcome::Failed(msg) = &outcome {
                warn!(unit = %id, operation = %operation, error = %msg, "dispatch unit failed");
            }
            // An owner abort that won the race suppresses delivery.
            if state
                .compare_exchange(RUNNING, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                sink.deliver(Completion {
                    unit_id: id,
                    operation,
                    outcome,
                });
            }
        }));
    }

    /// Forcibly stops a running worker. The wrapped platform call is dropped at its
    /// next suspension point; a remote side effect already issued is not undone.
    /// Returns true when the unit was still running.
    pub fn abort(&mut self) -> bool {
        let was_running = self
            .state
            .compare_exchange(RUNNING, ABORTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if was_running {
            if let Some(handle) = &self.handle {
                handle.abort();
            }
            debug!(unit = %self.id, operation = %self.operation, "dispatch unit aborted");
        }
        was_running
    }

    /// Waits for the worker task to wind down, whether it finished or was aborted.
    pub async fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
