//! Admin-side coordination of the live configuration and its repository.
//!
//! # Responsibilities
//! - Apply registration requests to the live configuration
//! - Persist after every effective change
//! - Disconnect and later restore servers found unavailable
//!
//! # Design Decisions
//! - Mutations happen in memory first, so a persist failure never loses a
//!   registration for the running process
//! - Admin operations serialize on the repository's sync lock, which the
//!   file watcher also takes before reading; readers of the configuration
//!   never wait on it or on file I/O

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::repository::{ConfigRepository, RepositoryError};
use crate::config::ConfigurationMarshaller;
use crate::observability::metrics;
use crate::registry::{Configuration, FailedHost, Operation, RegistrationRequest, Scope};

/// Result of one admin operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// The in-memory configuration changed.
    pub changed: bool,
    /// The configuration on disk reflects the change.
    pub persisted: bool,
}

/// Owns the live configuration on the router side.
pub struct ConfigurationManager {
    configuration: Arc<Configuration>,
    repository: Arc<dyn ConfigRepository>,
    marshaller: ConfigurationMarshaller,
    admin_lock: Arc<Mutex<()>>,
}

impl ConfigurationManager {
    /// Load the configuration through `repository` and take ownership of it.
    pub fn new(repository: Arc<dyn ConfigRepository>) -> Self {
        let configuration = repository.load();
        Self::with_configuration(configuration, repository)
    }

    pub fn with_configuration(
        configuration: Arc<Configuration>,
        repository: Arc<dyn ConfigRepository>,
    ) -> Self {
        let manager = Self {
            admin_lock: repository.sync_lock(),
            configuration,
            repository,
            marshaller: ConfigurationMarshaller::new(),
        };
        manager.record_gauges();
        manager
    }

    /// The live configuration read by the dispatch path.
    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    /// Apply one registration request and persist when it changed anything.
    pub fn apply(&self, operation: Operation, request: &RegistrationRequest) -> ApplyOutcome {
        let _guard = self.lock();
        let changed = match operation {
            Operation::Add => self
                .configuration
                .add_host(request.scope, &request.name, &request.url),
            Operation::Remove => self
                .configuration
                .remove_host(request.scope, &request.name, &request.url),
        };
        metrics::record_admin_operation(operation.as_str(), request.scope.as_str());

        if changed {
            tracing::info!(
                op = %operation,
                scope = %request.scope,
                name = %request.name,
                url = %request.url,
                "Routing configuration updated"
            );
        } else {
            tracing::debug!(
                op = %operation,
                scope = %request.scope,
                name = %request.name,
                url = %request.url,
                "Registration already applied"
            );
        }

        let persisted = !changed || self.persist_logged();
        ApplyOutcome { changed, persisted }
    }

    pub fn add(&self, request: &RegistrationRequest) -> ApplyOutcome {
        self.apply(Operation::Add, request)
    }

    pub fn remove(&self, request: &RegistrationRequest) -> ApplyOutcome {
        self.apply(Operation::Remove, request)
    }

    /// Write the current configuration.
    pub fn persist(&self) -> Result<(), RepositoryError> {
        let _guard = self.lock();
        self.repository.persist(&self.configuration)?;
        self.record_gauges();
        Ok(())
    }

    /// Current configuration in its file form.
    pub fn to_json(&self) -> String {
        self.marshaller.marshall(&self.configuration)
    }

    /// Take the server behind `url` out of rotation.
    pub fn disconnect_failed_host(&self, url: &str) -> FailedHost {
        let _guard = self.lock();
        let failed = self.configuration.remove_unavailable_server(url);
        if failed.is_empty() {
            tracing::debug!(url = %url, "No registered server matches failed url");
            return failed;
        }

        tracing::info!(
            url = ?failed.server_url,
            server = ?failed.server_id,
            containers = failed.containers.len(),
            "Server is now offline"
        );
        self.persist_logged();
        failed
    }

    /// Restore every entry `disconnect_failed_host` removed.
    pub fn reconnect_failed_host(&self, failed: &FailedHost) {
        let Some(url) = failed.server_url.as_deref() else {
            return;
        };

        let _guard = self.lock();
        let mut changed = false;
        for container in &failed.containers {
            changed |= self.configuration.add_host(Scope::Container, container, url);
        }
        if let Some(server) = failed.server_id.as_deref() {
            changed |= self.configuration.add_host(Scope::Server, server, url);
        }

        tracing::info!(url = %url, "Server is back online");
        if changed {
            self.persist_logged();
        }
    }

    /// Stop the repository watcher.
    pub fn close(&self) {
        self.repository.close();
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.admin_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist_logged(&self) -> bool {
        let result = self.repository.persist(&self.configuration);
        self.record_gauges();
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Routing change kept in memory only");
                false
            }
        }
    }

    fn record_gauges(&self) {
        metrics::record_registered_hosts(&self.configuration.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileRepository;

    fn manager(dir: &std::path::Path) -> ConfigurationManager {
        ConfigurationManager::new(Arc::new(FileRepository::new(dir)))
    }

    #[test]
    fn test_apply_persists_changes() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());

        let request = RegistrationRequest::container("unit-1", "http://h1:8080/");
        let outcome = manager.add(&request);
        assert_eq!(outcome, ApplyOutcome { changed: true, persisted: true });

        let again = manager.add(&request);
        assert!(!again.changed);

        let reloaded = FileRepository::new(dir.path()).load();
        assert_eq!(reloaded.hosts(Scope::Container, "unit-1"), vec!["http://h1:8080"]);

        manager.remove(&request);
        assert!(FileRepository::new(dir.path()).load().is_empty());
    }

    #[test]
    fn test_persist_failure_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let manager = manager(&blocker);

        let outcome = manager.add(&RegistrationRequest::server("server-1", "http://h1:9000"));
        assert_eq!(outcome, ApplyOutcome { changed: true, persisted: false });
        assert_eq!(
            manager.configuration().hosts(Scope::Server, "server-1"),
            vec!["http://h1:9000"]
        );
    }

    #[test]
    fn test_disconnect_and_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        manager.add(&RegistrationRequest::server("server-1", "http://h1:9000"));
        manager.add(&RegistrationRequest::container("unit-1", "http://h1:9000"));

        let failed = manager.disconnect_failed_host("http://h1:9000/containers/unit-1");
        assert_eq!(failed.containers, vec!["unit-1"]);
        assert!(manager.configuration().is_empty());
        assert!(FileRepository::new(dir.path()).load().is_empty());

        manager.reconnect_failed_host(&failed);
        let restored = FileRepository::new(dir.path()).load();
        assert_eq!(restored.hosts(Scope::Server, "server-1"), vec!["http://h1:9000"]);
        assert_eq!(restored.hosts(Scope::Container, "unit-1"), vec!["http://h1:9000"]);
    }
}
