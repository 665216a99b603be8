// tests/cancellation.rs

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use runlaunch_test_utils::builders::{RunRecordBuilder, bound_launcher, fast_settings};
use runlaunch_test_utils::fake_client::{FakeCall, FakeWorker};
use runlaunch_test_utils::init_tracing;

use runlaunch::config::LauncherSettings;
use runlaunch::errors::LaunchError;
use runlaunch::launcher::RunLauncher;
use runlaunch::rpc::TransportError;
use runlaunch::store::{CONNECTION_INFO_TAG, InMemoryRunStore, RunEventKind, RunStore};
use runlaunch::target::{ConnectionMetadata, ServerTarget};
use runlaunch::types::RunStatus;

type TestResult = Result<(), Box<dyn Error>>;

fn setup() -> (Arc<InMemoryRunStore>, FakeWorker, RunLauncher) {
    init_tracing();
    let store = Arc::new(InMemoryRunStore::new());
    let worker = FakeWorker::new();
    let launcher = bound_launcher(fast_settings(), Arc::new(worker.clone()), store.clone());
    (store, worker, launcher)
}

fn worker_connection() -> ConnectionMetadata {
    ConnectionMetadata::tcp("worker-host", 50051)
}

#[tokio::test]
async fn can_terminate_unknown_run_is_false_without_rpc() -> TestResult {
    let (_store, worker, launcher) = setup();

    assert!(!launcher.can_terminate("r2").await?);
    assert!(worker.calls().is_empty());
    assert!(worker.connections().is_empty());
    Ok(())
}

#[tokio::test]
async fn can_terminate_run_without_connection_tag_is_false() -> TestResult {
    let (store, worker, launcher) = setup();
    RunRecordBuilder::new("oob")
        .status(RunStatus::Started)
        .insert_into(&*store);

    assert!(!launcher.can_terminate("oob").await?);
    assert!(worker.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn can_terminate_finished_run_is_false_without_rpc() -> TestResult {
    let (store, worker, launcher) = setup();
    RunRecordBuilder::new("done")
        .status(RunStatus::Success)
        .launched_on(&worker_connection())
        .insert_into(&*store);

    assert!(!launcher.can_terminate("done").await?);
    assert!(worker.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn can_terminate_asks_worker_with_bounded_timeout() -> TestResult {
    let (store, worker, launcher) = setup();
    RunRecordBuilder::new("r1")
        .status(RunStatus::Started)
        .launched_on(&worker_connection())
        .insert_into(&*store);

    assert!(launcher.can_terminate("r1").await?);

    worker.set_can_cancel(false);
    assert!(!launcher.can_terminate("r1").await?);

    let calls = worker.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0],
        FakeCall::CanCancel {
            run_id: "r1".to_string(),
            timeout: Duration::from_secs(5),
        }
    );
    // Client is rebuilt from the persisted tag on every call.
    assert_eq!(worker.connections(), vec![worker_connection(), worker_connection()]);
    Ok(())
}

#[tokio::test]
async fn can_terminate_unreachable_worker_is_false() -> TestResult {
    let (store, worker, launcher) = setup();
    worker.unreachable();
    RunRecordBuilder::new("r1")
        .status(RunStatus::Started)
        .launched_on(&worker_connection())
        .insert_into(&*store);

    assert!(!launcher.can_terminate("r1").await?);
    Ok(())
}

fn garbled_reply() -> TransportError {
    TransportError::Protocol {
        endpoint: "worker-host:50051".to_string(),
        reason: "invalid JSON reply".to_string(),
    }
}

#[tokio::test]
async fn can_terminate_timeout_is_false() -> TestResult {
    let (store, worker, launcher) = setup();
    worker.fail_with(TransportError::Timeout {
        endpoint: "worker-host:50051".to_string(),
        timeout: Duration::from_secs(5),
    });
    RunRecordBuilder::new("r1")
        .status(RunStatus::Started)
        .launched_on(&worker_connection())
        .insert_into(&*store);

    assert!(!launcher.can_terminate("r1").await?);
    Ok(())
}

#[tokio::test]
async fn can_terminate_propagates_garbled_reply() -> TestResult {
    let (store, worker, launcher) = setup();
    worker.fail_with(garbled_reply());
    RunRecordBuilder::new("r1")
        .status(RunStatus::Started)
        .launched_on(&worker_connection())
        .insert_into(&*store);

    let result = launcher.can_terminate("r1").await;

    assert!(
        matches!(result, Err(LaunchError::Transport(TransportError::Protocol { .. }))),
        "{result:?}"
    );
    Ok(())
}

#[tokio::test]
async fn can_terminate_propagates_worker_rejection() -> TestResult {
    let (store, worker, launcher) = setup();
    worker.fail_with(TransportError::Remote {
        endpoint: "worker-host:50051".to_string(),
        message: "unknown method".to_string(),
    });
    RunRecordBuilder::new("r1")
        .status(RunStatus::Started)
        .launched_on(&worker_connection())
        .insert_into(&*store);

    let result = launcher.can_terminate("r1").await;

    assert!(
        matches!(result, Err(LaunchError::Transport(TransportError::Remote { .. }))),
        "{result:?}"
    );
    Ok(())
}

#[tokio::test]
async fn terminate_propagates_garbled_reply_after_recording_it() -> TestResult {
    let (store, worker, launcher) = setup();
    worker.fail_with(garbled_reply());
    RunRecordBuilder::new("r1")
        .status(RunStatus::Started)
        .launched_on(&worker_connection())
        .insert_into(&*store);

    let result = launcher.terminate("r1").await;

    assert!(
        matches!(result, Err(LaunchError::Transport(TransportError::Protocol { .. }))),
        "{result:?}"
    );
    let kinds: Vec<_> = store.events_for("r1")?.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![RunEventKind::Canceling, RunEventKind::Engine]);
    Ok(())
}

#[tokio::test]
async fn can_terminate_rejects_malformed_connection_tag() -> TestResult {
    let (store, worker, launcher) = setup();
    RunRecordBuilder::new("bad")
        .status(RunStatus::Started)
        .tag(CONNECTION_INFO_TAG, r#"{"port": 4000}"#)
        .insert_into(&*store);

    let result = launcher.can_terminate("bad").await;

    assert!(matches!(result, Err(LaunchError::InvalidConnectionMetadata(_))));
    assert!(worker.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn terminate_marks_canceling_before_cancel_rpc() -> TestResult {
    let (store, worker, launcher) = setup();
    RunRecordBuilder::new("r3")
        .status(RunStatus::Started)
        .launched_on(&worker_connection())
        .insert_into(&*store);

    let seen_status = Arc::new(Mutex::new(None));
    {
        let store = store.clone();
        let seen_status = seen_status.clone();
        worker.on_cancel(move |run_id| {
            let status = store
                .get_run_by_id(run_id)
                .unwrap()
                .map(|run| run.status);
            *seen_status.lock().unwrap() = status;
        });
    }

    assert!(launcher.terminate("r3").await?);

    assert_eq!(*seen_status.lock().unwrap(), Some(RunStatus::Canceling));
    assert_eq!(
        worker.calls(),
        vec![FakeCall::Cancel {
            run_id: "r3".to_string()
        }]
    );

    let events = store.events_for("r3")?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, RunEventKind::Canceling);
    Ok(())
}

#[tokio::test]
async fn terminate_reports_worker_refusal() -> TestResult {
    let (store, worker, launcher) = setup();
    worker.set_cancel_success(false);
    RunRecordBuilder::new("r1")
        .status(RunStatus::Started)
        .launched_on(&worker_connection())
        .insert_into(&*store);

    assert!(!launcher.terminate("r1").await?);

    // Still marked canceling: the mark is advisory.
    let run = store.get_run_by_id("r1")?.expect("run exists");
    assert_eq!(run.status, RunStatus::Canceling);
    Ok(())
}

#[tokio::test]
async fn terminate_unknown_run_is_false() -> TestResult {
    let (store, worker, launcher) = setup();

    assert!(!launcher.terminate("missing").await?);
    assert!(worker.calls().is_empty());
    assert!(store.events_for("missing")?.is_empty());
    Ok(())
}

#[tokio::test]
async fn terminate_finished_run_is_idempotent() -> TestResult {
    let (store, worker, launcher) = setup();
    RunRecordBuilder::new("done")
        .status(RunStatus::Canceled)
        .launched_on(&worker_connection())
        .insert_into(&*store);

    assert!(!launcher.terminate("done").await?);
    assert!(!launcher.terminate("done").await?);

    assert!(worker.calls().is_empty());
    let run = store.get_run_by_id("done")?.expect("run exists");
    assert_eq!(run.status, RunStatus::Canceled);

    let events = store.events_for("done")?;
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.kind == RunEventKind::Engine));
    assert!(events[0].message.contains("Unable to get a worker client"));
    Ok(())
}

#[tokio::test]
async fn terminate_unreachable_worker_is_false_and_logged() -> TestResult {
    let (store, worker, launcher) = setup();
    worker.unreachable();
    RunRecordBuilder::new("gone")
        .status(RunStatus::Started)
        .launched_on(&worker_connection())
        .insert_into(&*store);

    assert!(!launcher.terminate("gone").await?);

    let events = store.events_for("gone")?;
    let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![RunEventKind::Canceling, RunEventKind::Engine]);
    assert!(events[1].message.contains("could not be delivered"));
    Ok(())
}

#[tokio::test]
async fn cancellation_on_unbound_launcher_is_false() -> TestResult {
    init_tracing();
    let worker = FakeWorker::new();
    let launcher = RunLauncher::new(LauncherSettings::default(), Arc::new(worker.clone()));

    assert!(!launcher.can_terminate("r1").await?);
    assert!(!launcher.terminate("r1").await?);
    assert!(launcher.client_for_termination("r1")?.is_none());
    assert!(worker.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn launch_then_terminate_round_trip() -> TestResult {
    let (store, worker, launcher) = setup();
    let run = RunRecordBuilder::new("r1").insert_into(&*store);
    let target = ServerTarget::new("loc", worker_connection());

    launcher.launch(run, &target).await?;
    store.handle_status_change("r1", RunStatus::Started)?;

    assert!(launcher.can_terminate("r1").await?);
    assert!(launcher.terminate("r1").await?);

    let connections = worker.connections();
    assert_eq!(connections.len(), 3);
    assert!(connections.iter().all(|c| *c == worker_connection()));
    Ok(())
}
