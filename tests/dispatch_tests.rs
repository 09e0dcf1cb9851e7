mod support;

use gcloud_console::domains::platform::Credentials;
use gcloud_console::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use support::*;
use tokio::runtime::Handle;

/// Records what reached the consumer, and on which thread.
#[derive(Default)]
struct Received {
    succeeded: Vec<UnitOutput>,
    failed: Vec<String>,
    threads: Vec<std::thread::ThreadId>,
}

fn dispatch_into(dispatcher: &mut Dispatcher, request: OperationRequest, into: &Rc<RefCell<Received>>) -> UnitId {
    let ok = into.clone();
    let failed = into.clone();
    dispatcher.dispatch(
        request,
        move |output| {
            let mut r = ok.borrow_mut();
            r.threads.push(std::thread::current().id());
            r.succeeded.push(output);
        },
        move |message| {
            let mut r = failed.borrow_mut();
            r.threads.push(std::thread::current().id());
            r.failed.push(message);
        },
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn success_is_delivered_once_on_the_consumer_thread() {
    let platform = Arc::new(MockPlatform {
        services: vec![service("api", "Ready")],
        ..MockPlatform::default()
    });
    let mut dispatcher = Dispatcher::new(Arc::new(gateway(platform.clone())), Handle::current());
    let received = Rc::new(RefCell::new(Received::default()));

    dispatch_into(&mut dispatcher, OperationRequest::new("get_services"), &received);
    assert_eq!(dispatcher.pending(), 1);
    dispatcher.drain().await;
    assert_eq!(dispatcher.pending(), 0);

    let r = received.borrow();
    assert_eq!(r.succeeded.len(), 1);
    assert!(r.failed.is_empty());

    let env = r.succeeded[0].clone().into_envelope().unwrap();
    assert!(env.ok);
    assert_eq!(env.kind, ResultKind::Services);
    assert_eq!(env.services().count(), 1);

    let consumer = std::thread::current().id();
    assert_eq!(r.threads, vec![consumer]);
    let worker = platform.threads.lock().unwrap()[0];
    assert_ne!(worker, consumer);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gateway_faults_arrive_as_failed_envelopes() {
    let platform = Arc::new(MockPlatform::failing("permission denied"));
    let mut dispatcher = Dispatcher::new(Arc::new(gateway(platform)), Handle::current());
    let received = Rc::new(RefCell::new(Received::default()));

    dispatch_into(&mut dispatcher, OperationRequest::new("get_images"), &received);
    dispatcher.drain().await;

    let r = received.borrow();
    assert!(r.failed.is_empty());
    let env = r.succeeded[0].clone().into_envelope().unwrap();
    assert!(!env.ok);
    assert_eq!(env.error, Some(MockPlatform::api_error("permission denied")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_worker_reports_one_failure() {
    let platform = Arc::new(MockPlatform::panicking("socket closed unexpectedly"));
    let mut dispatcher = Dispatcher::new(Arc::new(gateway(platform)), Handle::current());
    let received = Rc::new(RefCell::new(Received::default()));

    dispatch_into(&mut dispatcher, OperationRequest::new("get_services"), &received);
    dispatcher.drain().await;

    let r = received.borrow();
    assert!(r.succeeded.is_empty());
    assert_eq!(r.failed.len(), 1);
    assert!(r.failed[0].contains("socket closed unexpectedly"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_operation_fails_without_touching_the_platform() {
    let platform = Arc::new(MockPlatform::default());
    let mut dispatcher = Dispatcher::new(Arc::new(gateway(platform.clone())), Handle::current());
    let received = Rc::new(RefCell::new(Received::default()));

    dispatch_into(&mut dispatcher, OperationRequest::new("delete_everything"), &received);
    dispatcher.drain().await;

    let r = received.borrow();
    assert!(r.succeeded.is_empty());
    assert_eq!(r.failed, vec!["Unknown operation: delete_everything".to_string()]);
    assert_eq!(platform.call_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_parameter_is_a_failure() {
    let mut dispatcher = Dispatcher::new(Arc::new(gateway(Arc::new(MockPlatform::default()))), Handle::current());
    let received = Rc::new(RefCell::new(Received::default()));

    let request = OperationRequest::new("get_logs").param("filter_str", 42);
    dispatch_into(&mut dispatcher, request, &received);
    dispatcher.drain().await;

    let r = received.borrow();
    assert_eq!(r.failed.len(), 1);
    assert!(r.failed[0].contains("filter_str"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_parameters_fall_back_to_defaults() {
    let platform = Arc::new(MockPlatform::default());
    let mut dispatcher = Dispatcher::new(Arc::new(gateway(platform.clone())), Handle::current());
    let received = Rc::new(RefCell::new(Received::default()));

    dispatch_into(&mut dispatcher, OperationRequest::new("get_logs"), &received);
    dispatch_into(&mut dispatcher, OperationRequest::new("add_permission"), &received);
    dispatcher.drain().await;

    assert_eq!(received.borrow().succeeded.len(), 2);
    let query = platform.last_log_query.lock().unwrap().clone().unwrap();
    assert_eq!(query.filter, "resource.type=cloud_run_revision");
    let (_, role, member) = platform.last_binding.lock().unwrap().clone().unwrap();
    assert_eq!(role, "roles/viewer");
    assert_eq!(member, "user:example@example.com");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_units_do_not_share_results() {
    let runtime = Handle::current();
    let first = Arc::new(MockPlatform {
        services: vec![service("alpha", "Ready")],
        ..MockPlatform::default()
    });
    let second = Arc::new(MockPlatform {
        services: vec![service("beta", "Ready"), service("gamma", "Ready")],
        delay: Some(Duration::from_millis(20)),
        ..MockPlatform::default()
    });
    let mut a = Dispatcher::new(Arc::new(gateway(first)), runtime.clone());
    let mut b = Dispatcher::new(Arc::new(gateway(second)), runtime);
    let got_a = Rc::new(RefCell::new(Received::default()));
    let got_b = Rc::new(RefCell::new(Received::default()));

    dispatch_into(&mut b, OperationRequest::new("get_services"), &got_b);
    dispatch_into(&mut a, OperationRequest::new("get_services"), &got_a);
    a.drain().await;
    b.drain().await;

    let names = |r: &Received| -> Vec<String> {
        r.succeeded[0]
            .clone()
            .into_envelope()
            .unwrap()
            .services()
            .map(|s| common::format::resource_name(&s.name).to_string())
            .collect()
    };
    assert_eq!(names(&got_a.borrow()), vec!["alpha"]);
    assert_eq!(names(&got_b.borrow()), vec!["beta", "gamma"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handlers_match_their_own_unit() {
    let platform = Arc::new(MockPlatform {
        credentials: Some(support_credentials()),
        ..MockPlatform::default()
    });
    let mut dispatcher = Dispatcher::new(Arc::new(gateway(platform)), Handle::current());
    let auth = Rc::new(RefCell::new(Received::default()));
    let services = Rc::new(RefCell::new(Received::default()));

    let auth_id = dispatch_into(&mut dispatcher, OperationRequest::new("check_auth"), &auth);
    let services_id = dispatch_into(&mut dispatcher, OperationRequest::new("get_services"), &services);
    assert_ne!(auth_id, services_id);
    dispatcher.drain().await;

    assert!(matches!(&auth.borrow().succeeded[..], [UnitOutput::Auth(s)] if s.authenticated));
    assert!(matches!(&services.borrow().succeeded[..], [UnitOutput::Envelope(_)]));
}

fn support_credentials() -> Credentials {
    Credentials {
        project: Some(PROJECT.to_string()),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn placeholder_project_is_resolved_by_a_dispatched_unit() {
    let platform = Arc::new(MockPlatform {
        credentials: Some(Credentials {
            project: Some("resolved-project".into()),
        }),
        ..MockPlatform::default()
    });
    let gw = Arc::new(gateway(platform.clone()));
    let mut dispatcher = Dispatcher::new(gw.clone(), Handle::current());

    assert!(dispatcher.resolve_project().is_none());
    assert_eq!(platform.call_count(), 0);

    gw.config().set_project_id(gcloud_console::config::PLACEHOLDER_PROJECT);
    assert!(dispatcher.resolve_project().is_some());
    assert_eq!(dispatcher.pending(), 1);
    dispatcher.drain().await;

    assert_eq!(gw.config().project_id(), "resolved-project");
    // The credential lookup ran on a worker, never on the consumer thread.
    let worker = platform.threads.lock().unwrap()[0];
    assert_ne!(worker, std::thread::current().id());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unresolved_credentials_leave_the_placeholder() {
    let gw = Arc::new(gateway(Arc::new(MockPlatform::default())));
    gw.config().set_project_id(gcloud_console::config::PLACEHOLDER_PROJECT);
    let mut dispatcher = Dispatcher::new(gw.clone(), Handle::current());

    dispatcher.resolve_project();
    dispatcher.drain().await;

    assert_eq!(gw.config().project_id(), gcloud_console::config::PLACEHOLDER_PROJECT);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn teardown_aborts_running_units_without_delivery() {
    let platform = Arc::new(MockPlatform {
        services: vec![service("slow", "Ready")],
        delay: Some(Duration::from_secs(30)),
        ..MockPlatform::default()
    });
    let mut dispatcher = Dispatcher::new(Arc::new(gateway(platform.clone())), Handle::current());
    let received = Rc::new(RefCell::new(Received::default()));

    dispatch_into(&mut dispatcher, OperationRequest::new("get_services"), &received);
    // Let the worker reach the platform call.
    while platform.call_count() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let aborted = tokio::time::timeout(Duration::from_secs(5), dispatcher.teardown())
        .await
        .expect("teardown must not wait for the platform call");
    assert_eq!(aborted, 1);

    let r = received.borrow();
    assert!(r.succeeded.is_empty());
    assert!(r.failed.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn teardown_after_completion_aborts_nothing() {
    let mut dispatcher = Dispatcher::new(Arc::new(gateway(Arc::new(MockPlatform::default()))), Handle::current());
    let received = Rc::new(RefCell::new(Received::default()));

    dispatch_into(&mut dispatcher, OperationRequest::new("get_projects"), &received);
    dispatcher.drain().await;
    assert_eq!(dispatcher.teardown().await, 0);
    assert_eq!(received.borrow().succeeded.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn standalone_unit_delivers_to_its_mailbox() {
    let gw = Arc::new(gateway(Arc::new(MockPlatform {
        services: vec![service("api", "Ready")],
        ..MockPlatform::default()
    })));
    let (sink, mut mailbox) = completion_channel();
    let mut unit = DispatchUnit::new(OperationRequest::new("get_services"), gw);
    assert_eq!(unit.state(), UnitState::Created);

    unit.start(&Handle::current(), sink);
    let completion = mailbox.recv().await.unwrap();
    unit.join().await;

    assert_eq!(completion.unit_id, unit.id());
    assert_eq!(completion.operation, "get_services");
    assert!(matches!(completion.outcome, Outcome::Succeeded(UnitOutput::Envelope(ref e)) if e.ok));
    assert_eq!(unit.state(), UnitState::Completed);
    assert!(!unit.abort());
    assert!(mailbox.try_recv().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn aborted_unit_never_delivers() {
    let gw = Arc::new(gateway(Arc::new(MockPlatform {
        delay: Some(Duration::from_secs(30)),
        ..MockPlatform::default()
    })));
    let (sink, mut mailbox) = completion_channel();
    let mut unit = DispatchUnit::new(OperationRequest::new("get_images"), gw);

    unit.start(&Handle::current(), sink);
    assert!(unit.is_running());
    assert!(unit.abort());
    unit.join().await;

    assert_eq!(unit.state(), UnitState::Aborted);
    assert!(mailbox.try_recv().is_none());
}

#[tokio::test]
#[should_panic(expected = "started twice")]
async fn starting_a_unit_twice_panics() {
    let gw = Arc::new(gateway(Arc::new(MockPlatform::default())));
    let (sink, _mailbox) = completion_channel();
    let mut unit = DispatchUnit::new(OperationRequest::new("get_projects"), gw);
    unit.start(&Handle::current(), sink.clone());
    unit.start(&Handle::current(), sink);
}

#[tokio::test]
async fn execute_runs_without_task_machinery() {
    let gw = gateway(Arc::new(MockPlatform::default()));
    let request = OperationRequest::run_command(["config", "list"]);

    let output = execute(&request, &gw).await.unwrap();
    assert!(matches!(output, UnitOutput::Command(ref out) if out.ok && out.exit_code == 0));

    let err = execute(&OperationRequest::new("get_billing"), &gw).await.unwrap_err();
    assert_eq!(err, DispatchError::UnknownOperation("get_billing".into()));
}
