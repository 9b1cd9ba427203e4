//! Integration tests for the scheduler driving a real collection cycle

use std::sync::{Arc, Mutex};
use std::time::Duration;

use qserver_core::monitoring::{FailureKind, MEMORY_COMMAND, service_status_command};
use qserver_core::testing::{Reply, ScriptedHost};
use qserver_core::{CollectionOutcome, ConnectionConfig, Scheduler, SessionCollector};

fn outcomes() -> (
    Arc<Mutex<Vec<CollectionOutcome>>>,
    impl Fn(CollectionOutcome) + Send + Sync + 'static,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |outcome| sink.lock().unwrap().push(outcome))
}

fn collector(host: &ScriptedHost, command_timeout: Duration) -> SessionCollector<ScriptedHost> {
    let config = ConnectionConfig::new("192.0.2.10", "monitor").with_services(["nginx", "redis"]);
    SessionCollector::new(host.clone(), Arc::new(config))
        .expect("valid config")
        .with_command_timeout(command_timeout)
}

#[tokio::test]
async fn test_hanging_service_delivers_exactly_one_timeout() {
    let host = ScriptedHost::healthy(&[("nginx", "active"), ("redis", "active")])
        .with_reply(service_status_command("redis"), Reply::Hang);
    let (seen, consumer) = outcomes();

    // Interval far longer than the test so only the immediate first tick fires
    let handle = Scheduler::new(
        Arc::new(collector(&host, Duration::from_millis(100))),
        Duration::from_secs(3600),
    )
    .start(consumer);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let stats = handle.stop().await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let failure = seen[0].as_ref().expect_err("timeout failure");
    assert_eq!(failure.kind, FailureKind::Timeout);
    assert_eq!(failure.command.as_deref(), Some("systemctl is-active redis"));

    assert_eq!(stats.cycles_started, 1);
    assert_eq!(stats.outcomes_delivered, 1);
    assert_eq!(host.sessions_opened(), 1);
    assert_eq!(host.open_sessions(), 0);
}

#[tokio::test]
async fn test_slow_cycles_never_overlap() {
    let host = ScriptedHost::healthy(&[("nginx", "active"), ("redis", "active")]).with_reply(
        MEMORY_COMMAND,
        Reply::Delayed(
            Duration::from_millis(80),
            Box::new(Reply::ok(qserver_core::testing::FREE_OUTPUT)),
        ),
    );
    let (seen, consumer) = outcomes();

    let handle = Scheduler::new(
        Arc::new(collector(&host, Duration::from_secs(5))),
        Duration::from_millis(20),
    )
    .start(consumer);

    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(host.open_sessions() <= 1, "cycles overlapped");
    }
    let stats = handle.stop().await;

    assert!(stats.ticks_skipped > 0, "{stats:?}");
    assert!(seen.lock().unwrap().iter().all(Result::is_ok));
    assert_eq!(host.open_sessions(), 0);
}

#[tokio::test]
async fn test_recovers_after_host_comes_back() {
    let host = ScriptedHost::healthy(&[("nginx", "active"), ("redis", "active")])
        .with_reply(MEMORY_COMMAND, Reply::DispatchError("channel closed".into()));
    let (seen, consumer) = outcomes();

    let handle = Scheduler::new(
        Arc::new(collector(&host, Duration::from_secs(1))),
        Duration::from_millis(20),
    )
    .start(consumer);

    tokio::time::sleep(Duration::from_millis(70)).await;
    host.set_reply(MEMORY_COMMAND, Reply::ok(qserver_core::testing::FREE_OUTPUT));
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.stop().await;

    let seen = seen.lock().unwrap();
    assert!(seen.first().is_some_and(Result::is_err));
    assert!(seen.last().is_some_and(Result::is_ok));
}

#[tokio::test]
async fn test_stop_releases_session_of_cancelled_cycle() {
    let host = ScriptedHost::healthy(&[("nginx", "active"), ("redis", "active")])
        .with_reply(service_status_command("nginx"), Reply::Hang);
    let (seen, consumer) = outcomes();

    let handle = Scheduler::new(
        Arc::new(collector(&host, Duration::from_secs(60))),
        Duration::from_millis(10),
    )
    .start(consumer);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(host.open_sessions(), 1);

    let stats = handle.stop().await;

    assert_eq!(stats.outcomes_delivered, 0);
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(host.sessions_opened(), 1);
    assert_eq!(host.open_sessions(), 0);
}
