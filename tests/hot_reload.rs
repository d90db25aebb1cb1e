//! Routing file watcher applying operator edits to the live configuration.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use router_registry::config::{ConfigRepository, FileRepository, HotReload, CONFIG_FILE_NAME};
use router_registry::registry::{
    Configuration, ConfigurationListener, ConfigurationManager, RegistrationRequest, Scope,
};

fn watched_repository(dir: &std::path::Path) -> FileRepository {
    FileRepository::new(dir).with_hot_reload(HotReload {
        poll: Duration::from_millis(50),
    })
}

fn wait_until(deadline: Duration, check: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
    check()
}

#[derive(Default)]
struct ReloadCounter(AtomicUsize);

impl ConfigurationListener for ReloadCounter {
    fn on_configuration_reloaded(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_external_edit_is_applied_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let repo = watched_repository(dir.path());
    let configuration: Arc<Configuration> = repo.load();
    assert!(repo.is_watching());

    let counter = Arc::new(ReloadCounter::default());
    configuration.add_listener(counter.clone());

    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"{"containers": [{"unit-1": ["http://h1:8080"]}], "servers": [{"server-1": ["http://h1:8080/"]}]}"#,
    )
    .unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        configuration.hosts(Scope::Container, "unit-1") == vec!["http://h1:8080".to_string()]
    }));
    assert_eq!(
        configuration.hosts(Scope::Server, "server-1"),
        vec!["http://h1:8080".to_string()]
    );
    assert!(counter.0.load(Ordering::SeqCst) >= 1);

    repo.close();
    assert!(!repo.is_watching());
}

#[test]
fn test_malformed_edit_keeps_previous_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, r#"{"containers": [{"unit-1": ["http://h1:8080"]}]}"#).unwrap();

    let repo = watched_repository(dir.path());
    let configuration = repo.load();
    assert_eq!(configuration.hosts(Scope::Container, "unit-1").len(), 1);

    std::fs::write(&path, "{ not json").unwrap();
    std::thread::sleep(Duration::from_millis(500));
    assert_eq!(
        configuration.hosts(Scope::Container, "unit-1"),
        vec!["http://h1:8080".to_string()]
    );

    // A later valid edit still applies.
    std::fs::write(&path, r#"{"containers": [{"unit-2": ["http://h2:8080"]}]}"#).unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        configuration.hosts(Scope::Container, "unit-2").len() == 1
    }));
    assert!(configuration.hosts(Scope::Container, "unit-1").is_empty());
}

#[test]
fn test_unrelated_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let repo = watched_repository(dir.path());
    let configuration = repo.load();
    configuration.add_container_host("unit-1", "http://h1:8080");

    let counter = Arc::new(ReloadCounter::default());
    configuration.add_listener(counter.clone());

    std::fs::write(dir.path().join("other.json"), r#"{"containers": []}"#).unwrap();
    std::thread::sleep(Duration::from_millis(500));

    assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    assert_eq!(configuration.hosts(Scope::Container, "unit-1").len(), 1);
}

#[test]
fn test_own_persist_round_trips_through_watcher() {
    let dir = tempfile::tempdir().unwrap();
    let repo = watched_repository(dir.path());
    let configuration = repo.load();

    configuration.add_server_host("server-1", "http://h1:8080");
    repo.persist(&configuration).unwrap();
    std::thread::sleep(Duration::from_millis(300));

    assert_eq!(
        configuration.hosts(Scope::Server, "server-1"),
        vec!["http://h1:8080".to_string()]
    );
}

#[test]
fn test_replace_by_rename_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let repo = watched_repository(dir.path());
    let configuration = repo.load();

    let staging = dir.path().join(format!("{}.swp", CONFIG_FILE_NAME));
    std::fs::write(&staging, r#"{"containers": [{"unit-1": ["http://a"]}]}"#).unwrap();
    std::fs::rename(&staging, dir.path().join(CONFIG_FILE_NAME)).unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        configuration.hosts(Scope::Container, "unit-1") == vec!["http://a".to_string()]
    }));
}

#[test]
fn test_concurrent_admin_writes_survive_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let repo = FileRepository::new(dir.path()).with_hot_reload(HotReload {
        poll: Duration::from_millis(20),
    });
    let manager = Arc::new(ConfigurationManager::new(Arc::new(repo)));

    let writers: Vec<_> = (0..4)
        .map(|writer| {
            let manager = manager.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    let request = RegistrationRequest::container(
                        format!("unit-{}-{}", writer, i),
                        "http://h1:8080",
                    );
                    let outcome = manager.add(&request);
                    assert!(outcome.changed && outcome.persisted);
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    // Let the watcher drain every event the writes produced.
    std::thread::sleep(Duration::from_millis(1000));

    let in_memory = manager.configuration().hosts_per_container().len();
    let on_disk = FileRepository::new(dir.path())
        .read()
        .unwrap()
        .unwrap()
        .hosts_per_container()
        .len();
    assert_eq!(in_memory, 400);
    assert_eq!(on_disk, 400);
    manager.close();
}
