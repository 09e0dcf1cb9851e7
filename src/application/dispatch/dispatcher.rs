use super::mailbox::{completion_channel, CompletionSink, Mailbox};
use super::request::{Operation, OperationRequest};
use super::unit::{Completion, DispatchUnit, Outcome, UnitId, UnitOutput};
use crate::application::gateway::OperationGateway;
use crate::common::AuthStatus;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

type SuccessHandler = Box<dyn FnOnce(UnitOutput)>;
type FailureHandler = Box<dyn FnOnce(String)>;

struct Subscription {
    on_succeeded: SuccessHandler,
    on_failed: FailureHandler,
}

/// View-side owner of dispatch units.
///
/// Lives on the interactive context: handlers run inside `pump`/`pump_next`, on
/// whichever thread calls them, never on a worker. Every spawned unit is tracked
/// until it delivers so that `teardown` can stop the stragglers.
pub struct Dispatcher {
    gateway: Arc<OperationGateway>,
    runtime: Handle,
    sink: CompletionSink,
    mailbox: Mailbox,
    units: Vec<DispatchUnit>,
    subscriptions: HashMap<UnitId, Subscription>,
}

impl Dispatcher {
    pub fn new(gateway: Arc<OperationGateway>, runtime: Handle) -> Self {
        let (sink, mailbox) = completion_channel();
        Self {
            gateway,
            runtime,
            sink,
            mailbox,
            units: Vec::new(),
            subscriptions: HashMap::new(),
        }
    }

    /// Creates a fresh unit for `request` and starts it. Exactly one of the two
    /// handlers will run, unless the unit is torn down first.
    pub fn dispatch<S, F>(&mut self, request: OperationRequest, on_succeeded: S, on_failed: F) -> UnitId
    where
        S: FnOnce(UnitOutput) + 'static,
        F: FnOnce(String) + 'static,
    {
        let mut unit = DispatchUnit::new(request, self.gateway.clone());
        let id = unit.id();
        self.subscriptions.insert(
            id,
            Subscription {
                on_succeeded: Box::new(on_succeeded),
                on_failed: Box::new(on_failed),
            },
        );
        unit.start(&self.runtime, self.sink.clone());
        self.units.push(unit);
        id
    }

    /// Replaces a placeholder project with the one bound to default credentials.
    ///
    /// The credential check runs as an ordinary `check_auth` unit; its handler writes
    /// the project into the shared store once the completion is pumped. `None` when
    /// the configured project is already real.
    pub fn resolve_project(&mut self) -> Option<UnitId> {
        let store = self.gateway.config().clone();
        if !store.snapshot().has_placeholder_project() {
            return None;
        }
        let id = self.dispatch(
            OperationRequest::new(Operation::CheckAuth.as_str()),
            move |output| {
                if let UnitOutput::Auth(AuthStatus {
                    project: Some(project),
                    ..
                }) = output
                {
                    // A project set meanwhile by the user wins.
                    if store.snapshot().has_placeholder_project() {
                        info!(project = %project, "using project from default credentials");
                        store.set_project_id(project);
                    }
                }
            },
            |message| warn!(error = %message, "project resolution failed"),
        );
        Some(id)
    }

    /// Number of units that have not delivered yet.
    pub fn pending(&self) -> usize {
        self.subscriptions.len()
    }

    /// Delivers every completion already waiting. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(completion) = self.mailbox.try_recv() {
            self.deliver(completion);
            handled += 1;
        }
        handled
    }

    /// Waits for the next completion and delivers it. `None` when nothing is pending.
    pub async fn pump_next(&mut self) -> Option<UnitId> {
        if self.subscriptions.is_empty() {
            return None;
        }
        let completion = self.mailbox.recv().await?;
        let id = completion.unit_id;
        self.deliver(completion);
        Some(id)
    }

    /// Delivers completions until no unit is pending.
    pub async fn drain(&mut self) {
        while self.pump_next().await.is_some() {}
    }

    fn deliver(&mut self, completion: Completion) {
        self.units.retain(|u| u.id() != completion.unit_id);
        let Some(subscription) = self.subscriptions.remove(&completion.unit_id) else {
            debug!(unit = %completion.unit_id, "completion without subscriber");
            return;
        };
        match completion.outcome {
            Outcome::Succeeded(output) => (subscription.on_succeeded)(output),
            Outcome::Failed(message) => (subscription.on_failed)(message),
        }
    }

    /// Forcibly stops every unit still running, waits for the workers to exit and
    /// drops their handlers undelivered. Returns how many units were aborted.
    pub async fn teardown(mut self) -> usize {
        let mut aborted = 0;
        for unit in self.units.iter_mut() {
            if unit.abort() {
                aborted += 1;
            }
        }
        for unit in self.units.iter_mut() {
            unit.join().await;
        }
        // Completions that raced in before the aborts still reach their handlers.
        self.pump();
        if aborted > 0 {
            info!(aborted, "dispatcher torn down with units still running");
        }
        self.units.clear();
        self.subscriptions.clear();
        aborted
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        for unit in self.units.iter_mut() {
            unit.abort();
        }
    }
}
