//! Failed host disconnection and recovery.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{base_url, start_programmable_router};
use router_registry::config::schema::RecoverySettings;
use router_registry::config::FileRepository;
use router_registry::health::FailedHostMonitor;
use router_registry::lifecycle::Shutdown;
use router_registry::registry::{ConfigurationManager, Scope};

fn settings(attempt_limit: Option<u32>) -> RecoverySettings {
    RecoverySettings {
        attempt_interval_secs: 1,
        attempt_limit,
        timeout_ms: 500,
    }
}

#[tokio::test]
async fn test_unavailable_server_is_restored_when_back() {
    let up = Arc::new(AtomicBool::new(false));
    let flag = up.clone();
    let server = start_programmable_router(move |_| {
        let status = if flag.load(Ordering::SeqCst) { 200 } else { 503 };
        async move { (status, String::new()) }
    })
    .await;
    let server_url = base_url(server);

    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(ConfigurationManager::new(Arc::new(FileRepository::new(dir.path()))));
    let configuration = manager.configuration().clone();
    configuration.add_server_host("server-1", &server_url);
    configuration.add_container_host("unit-1", &server_url);
    configuration.add_container_host("unit-2", &server_url);
    configuration.add_container_host("unit-2", "http://h2:8080");

    let monitor = Arc::new(FailedHostMonitor::new(manager.clone(), settings(None)).unwrap());
    let failed = monitor.report_unavailable(&format!("{}/unit-1/invoke", server_url));
    assert_eq!(failed.server_id.as_deref(), Some("server-1"));
    assert_eq!(failed.containers, vec!["unit-1".to_string(), "unit-2".to_string()]);
    assert_eq!(monitor.pending(), 1);

    assert!(configuration.hosts(Scope::Server, "server-1").is_empty());
    assert!(configuration.hosts(Scope::Container, "unit-1").is_empty());
    assert_eq!(
        configuration.hosts(Scope::Container, "unit-2"),
        vec!["http://h2:8080".to_string()]
    );

    monitor.check_all().await;
    assert_eq!(monitor.pending(), 1);
    assert!(configuration.hosts(Scope::Container, "unit-1").is_empty());

    up.store(true, Ordering::SeqCst);
    monitor.check_all().await;
    assert_eq!(monitor.pending(), 0);
    assert_eq!(configuration.hosts(Scope::Server, "server-1"), vec![server_url.clone()]);
    assert_eq!(configuration.hosts(Scope::Container, "unit-1"), vec![server_url.clone()]);
    assert_eq!(configuration.hosts(Scope::Container, "unit-2").len(), 2);
}

#[tokio::test]
async fn test_monitor_gives_up_after_limit() {
    let server = start_programmable_router(|_| async { (503, String::new()) }).await;
    let server_url = base_url(server);

    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(ConfigurationManager::new(Arc::new(FileRepository::new(dir.path()))));
    manager.configuration().add_container_host("unit-1", &server_url);

    let monitor = Arc::new(FailedHostMonitor::new(manager.clone(), settings(Some(2))).unwrap());
    monitor.report_unavailable(&server_url);

    monitor.check_all().await;
    monitor.check_all().await;
    assert_eq!(monitor.pending(), 1);
    monitor.check_all().await;
    assert_eq!(monitor.pending(), 0);
    assert!(manager.configuration().is_empty());
}

#[tokio::test]
async fn test_unknown_url_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(ConfigurationManager::new(Arc::new(FileRepository::new(dir.path()))));
    manager.configuration().add_container_host("unit-1", "http://h1:8080");

    let monitor = FailedHostMonitor::new(manager.clone(), settings(None)).unwrap();
    let failed = monitor.report_unavailable("http://h1:80801/unit-1");
    assert!(failed.is_empty());
    assert_eq!(monitor.pending(), 0);
    assert_eq!(manager.configuration().hosts(Scope::Container, "unit-1").len(), 1);
}

#[tokio::test]
async fn test_run_loop_stops_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(ConfigurationManager::new(Arc::new(FileRepository::new(dir.path()))));
    let monitor = Arc::new(FailedHostMonitor::new(manager, settings(None)).unwrap());

    let shutdown = Shutdown::new();
    let task = tokio::spawn(monitor.run(shutdown.subscribe()));
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap();
}
