mod common;

use std::error::Error as _;
use std::time::Duration;

use common::{Journal, ManualSignal, RecordingService, RecordingSource, Setup};
use svcrunner::{Config, ForegroundRunner, RunError, Runner, ShutdownSignal};

const LIMIT: Duration = Duration::from_secs(5);

fn runner(source: RecordingSource, signal: &ManualSignal) -> ForegroundRunner {
    ForegroundRunner::new(&Config::default())
        .with_notifier(source)
        .with_signals(signal.clone())
}

async fn run_to_end(runner: &ForegroundRunner, service: &RecordingService, shutdown: &ShutdownSignal) -> Result<(), RunError> {
    tokio::time::timeout(LIMIT, runner.run(service, shutdown))
        .await
        .expect("run must not hang")
}

#[tokio::test]
async fn test_interrupt_stops_service_once() {
    let journal = Journal::default();
    let signal = ManualSignal::default();
    let runner = runner(RecordingSource::new(&journal, Setup::Present), &signal);
    let service = RecordingService::new(&journal);
    let shutdown = ShutdownSignal::new();

    let handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { runner.run(&service, &shutdown).await })
    };

    // Running and waiting: stop must not have been called yet.
    while journal.count("notify:READY=1") == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(journal.count("stop"), 0);

    signal.fire();
    let result = tokio::time::timeout(LIMIT, handle).await.unwrap().unwrap();

    assert!(result.is_ok());
    assert!(shutdown.is_triggered());
    assert_eq!(
        journal.entries(),
        ["init", "start", "notify:READY=1", "notify:STOPPING=1", "stop", "close"]
    );
}

#[tokio::test]
async fn test_init_failure_short_circuits() {
    let journal = Journal::default();
    let signal = ManualSignal::default();
    let runner = runner(RecordingSource::new(&journal, Setup::Present), &signal);
    let service = RecordingService::new(&journal).failing_init("disk full");

    let err = run_to_end(&runner, &service, &ShutdownSignal::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Init(_)));
    assert!(err.to_string().contains("disk full"));
    assert_eq!(err.source().unwrap().to_string(), "disk full");
    assert_eq!(journal.entries(), ["init", "close"]);
}

#[tokio::test]
async fn test_start_failure_never_stops() {
    let journal = Journal::default();
    let signal = ManualSignal::default();
    let runner = runner(RecordingSource::new(&journal, Setup::Present), &signal);
    let service = RecordingService::new(&journal).failing_start("port in use");

    let err = run_to_end(&runner, &service, &ShutdownSignal::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Start(_)));
    assert_eq!(err.as_label(), "service_start");
    assert_eq!(journal.entries(), ["init", "start", "close"]);
}

#[tokio::test]
async fn test_repeated_stop_requests_terminate_once() {
    let journal = Journal::default();
    let signal = ManualSignal::default();
    let runner = runner(RecordingSource::new(&journal, Setup::Present), &signal);
    let service = RecordingService::new(&journal);
    let shutdown = ShutdownSignal::new();

    for _ in 0..5 {
        shutdown.trigger();
    }
    run_to_end(&runner, &service, &shutdown).await.unwrap();

    assert_eq!(journal.count("stop"), 1);
    assert_eq!(journal.count("notify:STOPPING=1"), 1);
}

#[tokio::test]
async fn test_signal_racing_stop_request_resolves_once() {
    for _ in 0..20 {
        let journal = Journal::default();
        let signal = ManualSignal::default();
        let runner = runner(RecordingSource::new(&journal, Setup::Present), &signal);
        let service = RecordingService::new(&journal);
        let shutdown = ShutdownSignal::new();

        let remote = shutdown.clone();
        let fire = signal.clone();
        let a = tokio::spawn(async move { remote.trigger() });
        let b = tokio::spawn(async move { fire.fire() });

        run_to_end(&runner, &service, &shutdown).await.unwrap();
        a.await.unwrap();
        b.await.unwrap();

        assert_eq!(journal.count("stop"), 1);
    }
}

#[tokio::test]
async fn test_missing_supervisor_matches_present_supervisor() {
    let present = Journal::default();
    let absent = Journal::default();
    let missing = Journal::default();

    for (journal, setup) in [
        (&present, Setup::Present),
        (&absent, Setup::Absent),
        (&missing, Setup::Missing),
    ] {
        let signal = ManualSignal::default();
        signal.fire();
        let runner = runner(RecordingSource::new(journal, setup), &signal);
        let service = RecordingService::new(journal);
        run_to_end(&runner, &service, &ShutdownSignal::new())
            .await
            .unwrap();
    }

    let service_calls = |j: &Journal| -> Vec<String> {
        j.entries()
            .into_iter()
            .filter(|e| !e.starts_with("notify:") && e != "close")
            .collect()
    };
    assert_eq!(service_calls(&present), ["init", "start", "stop"]);
    assert_eq!(absent.entries(), ["init", "start", "stop"]);
    assert_eq!(missing.entries(), ["init", "start", "stop"]);
}

#[tokio::test]
async fn test_broken_supervisor_socket_is_fatal() {
    let journal = Journal::default();
    let signal = ManualSignal::default();
    let runner = runner(RecordingSource::new(&journal, Setup::Broken), &signal);
    let service = RecordingService::new(&journal);

    let err = run_to_end(&runner, &service, &ShutdownSignal::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::NotifierSetup(_)));
    assert!(journal.entries().is_empty());
}

#[tokio::test]
async fn test_notify_failures_are_not_run_failures() {
    let journal = Journal::default();
    let signal = ManualSignal::default();
    signal.fire();
    let source = RecordingSource::new(&journal, Setup::Present).failing_notify();
    let runner = runner(source, &signal);
    let service = RecordingService::new(&journal);

    run_to_end(&runner, &service, &ShutdownSignal::new())
        .await
        .unwrap();
    assert_eq!(journal.entries(), ["init", "start", "stop", "close"]);
}

#[tokio::test]
async fn test_stop_and_teardown_failures_are_both_reported() {
    let journal = Journal::default();
    let signal = ManualSignal::default();
    signal.fire();
    let source = RecordingSource::new(&journal, Setup::Present).failing_close();
    let runner = runner(source, &signal);
    let service = RecordingService::new(&journal).failing_stop("flush failed");

    let err = run_to_end(&runner, &service, &ShutdownSignal::new())
        .await
        .unwrap_err();

    let labels: Vec<_> = err.errors().map(RunError::as_label).collect();
    assert_eq!(labels, ["service_stop", "notifier_teardown"]);
    assert!(err.to_string().contains("flush failed"));
    assert!(err.to_string().contains("close failed"));
}

#[tokio::test]
async fn test_teardown_failure_alone_is_reported() {
    let journal = Journal::default();
    let signal = ManualSignal::default();
    signal.fire();
    let source = RecordingSource::new(&journal, Setup::Present).failing_close();
    let runner = runner(source, &signal);
    let service = RecordingService::new(&journal);

    let err = run_to_end(&runner, &service, &ShutdownSignal::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::NotifierTeardown(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn test_systemd_socket_receives_ready_then_stopping() {
    use std::os::unix::net::UnixDatagram;

    use svcrunner::notify::SystemdSource;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notify.sock");
    let server = UnixDatagram::bind(&path).unwrap();

    let journal = Journal::default();
    let signal = ManualSignal::default();
    signal.fire();
    let runner = ForegroundRunner::new(&Config::default())
        .with_notifier(SystemdSource::at(path.as_os_str()))
        .with_signals(signal);
    let service = RecordingService::new(&journal);

    run_to_end(&runner, &service, &ShutdownSignal::new())
        .await
        .unwrap();

    let mut buf = [0u8; 64];
    let n = server.recv(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"READY=1");
    let n = server.recv(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"STOPPING=1");
}

/// Service holding a borrow of caller-owned state.
struct Borrowing<'a> {
    calls: &'a std::sync::Mutex<Vec<&'static str>>,
}

#[async_trait::async_trait]
impl<'a> svcrunner::Service for Borrowing<'a> {
    fn name(&self) -> &str {
        "borrowing"
    }

    async fn init(&self) -> Result<(), svcrunner::BoxError> {
        self.calls.lock().unwrap().push("init");
        Ok(())
    }

    async fn start(&self) -> Result<(), svcrunner::BoxError> {
        self.calls.lock().unwrap().push("start");
        Ok(())
    }

    async fn stop(&self) -> Result<(), svcrunner::BoxError> {
        self.calls.lock().unwrap().push("stop");
        Ok(())
    }
}

#[tokio::test]
async fn test_service_may_borrow_local_state() {
    let calls = std::sync::Mutex::new(Vec::new());
    let service = Borrowing { calls: &calls };

    let journal = Journal::default();
    let signal = ManualSignal::default();
    signal.fire();
    let runner = runner(RecordingSource::new(&journal, Setup::Absent), &signal);

    tokio::time::timeout(LIMIT, runner.run(&service, &ShutdownSignal::new()))
        .await
        .expect("run must not hang")
        .unwrap();

    assert_eq!(*calls.lock().unwrap(), ["init", "start", "stop"]);
}
