//! Integration tests for a single collection cycle
//!
//! Each test builds a `SessionCollector` over a `ScriptedHost` and checks
//! the outcome plus what happened to the session.

use std::sync::Arc;
use std::time::Duration;

use qserver_core::monitoring::{
    FailureKind, FailureStage, MEMORY_COMMAND, OS_RELEASE_COMMAND, Probe, STORAGE_COMMAND,
    UPTIME_COMMAND, service_status_command,
};
use qserver_core::testing::{Reply, ScriptedHost};
use qserver_core::{AppConfig, Collector, ConnectionConfig, SessionCollector};

const SERVICES: [&str; 3] = ["nginx", "redis", "postgresql"];

fn config() -> Arc<ConnectionConfig> {
    Arc::new(ConnectionConfig::new("192.0.2.10", "monitor").with_services(SERVICES))
}

fn collector(host: &ScriptedHost) -> SessionCollector<ScriptedHost> {
    SessionCollector::new(host.clone(), config())
        .expect("valid config")
        .with_connect_timeout(Duration::from_millis(250))
        .with_command_timeout(Duration::from_millis(250))
}

#[tokio::test]
async fn test_commands_run_in_fixed_order_over_one_session() {
    let host = ScriptedHost::healthy(&[
        ("nginx", "active"),
        ("redis", "active"),
        ("postgresql", "active"),
    ]);

    let snapshot = collector(&host).collect().await.expect("snapshot");

    let expected: Vec<String> = Probe::battery(&config().services)
        .iter()
        .map(Probe::command)
        .collect();
    assert_eq!(host.commands_run(), expected);
    assert_eq!(host.commands_run()[0], MEMORY_COMMAND);
    assert_eq!(host.commands_run().last().map(String::as_str), Some(UPTIME_COMMAND));

    assert_eq!(host.sessions_opened(), 1);
    assert_eq!(host.open_sessions(), 0);
    assert!(snapshot.all_services_active());
    assert_eq!(snapshot.services.len(), 3);
}

#[tokio::test]
async fn test_service_order_follows_configuration() {
    let host = ScriptedHost::healthy(&[
        ("postgresql", "activating"),
        ("redis", "failed"),
        ("nginx", "active"),
    ]);

    let snapshot = collector(&host).collect().await.expect("snapshot");

    let pairs: Vec<(&str, &str)> = snapshot
        .services
        .iter()
        .map(|s| (s.name.as_str(), s.status.as_str()))
        .collect();
    assert_eq!(
        pairs,
        [
            ("nginx", "active"),
            ("redis", "failed"),
            ("postgresql", "activating"),
        ]
    );
    let unhealthy: Vec<_> = snapshot.services.unhealthy().map(|s| s.name.as_str()).collect();
    assert_eq!(unhealthy, ["redis", "postgresql"]);
}

#[tokio::test]
async fn test_slow_but_bounded_command_still_succeeds() {
    let host = ScriptedHost::healthy(&[
        ("nginx", "active"),
        ("redis", "active"),
        ("postgresql", "active"),
    ])
    .with_reply(
        STORAGE_COMMAND,
        Reply::Delayed(
            Duration::from_millis(50),
            Box::new(Reply::ok("total 120G 45G 75G 38% -\n")),
        ),
    );

    let snapshot = collector(&host).collect().await.expect("snapshot");
    assert_eq!(snapshot.storage.total.display(), "120G");
    assert_eq!(snapshot.storage.used.numeric(), Some(45.0));
    assert_eq!(snapshot.storage.total.numeric(), Some(120.0));
}

#[tokio::test]
async fn test_second_service_hang_yields_one_timeout_failure() {
    let host = ScriptedHost::healthy(&[
        ("nginx", "active"),
        ("redis", "active"),
        ("postgresql", "active"),
    ])
    .with_reply(service_status_command("redis"), Reply::Hang);

    let failure = collector(&host).collect().await.expect_err("timeout");

    assert_eq!(failure.kind, FailureKind::Timeout);
    assert_eq!(failure.stage, FailureStage::Command);
    assert_eq!(failure.command.as_deref(), Some("systemctl is-active redis"));
    assert_eq!(host.open_sessions(), 0);
    assert!(
        !host
            .commands_run()
            .contains(&service_status_command("postgresql"))
    );
}

#[tokio::test]
async fn test_bad_os_release_fails_whole_cycle() {
    let host = ScriptedHost::healthy(&[
        ("nginx", "active"),
        ("redis", "active"),
        ("postgresql", "active"),
    ])
    .with_reply(OS_RELEASE_COMMAND, Reply::exit("", 1));

    let failure = collector(&host).collect().await.expect_err("parse failure");

    assert_eq!(failure.kind, FailureKind::Parse);
    assert_eq!(failure.command.as_deref(), Some(OS_RELEASE_COMMAND));
    assert_eq!(host.open_sessions(), 0);
}

#[tokio::test]
async fn test_refused_connection_runs_nothing() {
    let host = ScriptedHost::healthy(&[]).refusing("Permission denied (publickey,password)");

    let failure = collector(&host).collect().await.expect_err("connect failure");

    assert_eq!(failure.kind, FailureKind::Connect);
    assert!(failure.command.is_none());
    assert_eq!(host.sessions_opened(), 0);
    assert!(host.commands_run().is_empty());
}

#[tokio::test]
async fn test_collector_built_from_config_file() {
    let config = AppConfig::from_toml_str(
        r#"
[ssh]
hostname = "192.0.2.10"
username = "monitor"
services = "nginx,redis"

[monitoring]
command_timeout_secs = 1
"#,
    )
    .expect("config");

    let host = ScriptedHost::healthy(&[("nginx", "active"), ("redis", "inactive")]);
    let collector = SessionCollector::with_settings(
        host.clone(),
        Arc::new(config.connection_config()),
        &config.monitoring,
    )
    .expect("valid config");

    let snapshot = collector.collect().await.expect("snapshot");
    assert_eq!(snapshot.services.get("redis"), Some("inactive"));
    assert_eq!(collector.config().services, ["nginx", "redis"]);
}
