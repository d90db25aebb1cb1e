//! Live routing configuration.
//!
//! # Responsibilities
//! - Hold the container and server endpoint maps for one router
//! - Serve lock-free reads to the dispatch path
//! - Apply admin mutations and whole-table reloads without changing identity
//! - Notify registered listeners of effective changes
//!
//! # Design Decisions
//! - Both maps live in one immutable `RoutingTable` published via `ArcSwap`,
//!   so readers never see old containers next to new servers
//! - Writers serialize on a mutex and clone-modify-store; no I/O happens
//!   while it is held
//! - Listeners are called after the store and after the mutex is released

use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::registry::endpoint::normalize_url;
use crate::registry::{ConfigurationListener, HostMap, RoutingTable, Scope};

/// What `remove_unavailable_server` took out of the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailedHost {
    /// Server whose endpoint matched, if one was registered.
    pub server_id: Option<String>,
    /// The matched base URL.
    pub server_url: Option<String>,
    /// Containers that were served by that URL.
    pub containers: Vec<String>,
}

impl FailedHost {
    /// Nothing matched the request URL.
    pub fn is_empty(&self) -> bool {
        self.server_url.is_none()
    }
}

enum Change {
    Added(Scope, String, String),
    Removed(Scope, String, String),
    Reloaded,
}

/// The registry one router consults to pick a target endpoint.
pub struct Configuration {
    table: ArcSwap<RoutingTable>,
    write_lock: Mutex<()>,
    listeners: RwLock<Vec<Arc<dyn ConfigurationListener>>>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("table", &*self.table.load())
            .finish()
    }
}

impl Configuration {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::from_table(RoutingTable::new())
    }

    pub fn from_table(table: RoutingTable) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
            write_lock: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Current snapshot of both maps. Never blocks.
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.table.load_full()
    }

    pub fn hosts_per_container(&self) -> HostMap {
        self.table.load().hosts_per_container().clone()
    }

    pub fn hosts_per_server(&self) -> HostMap {
        self.table.load().hosts_per_server().clone()
    }

    /// Endpoints registered for `name` in `scope`.
    pub fn hosts(&self, scope: Scope, name: &str) -> Vec<String> {
        self.table.load().hosts(scope, name)
    }

    pub fn is_empty(&self) -> bool {
        self.table.load().is_empty()
    }

    /// Register `url` for `name`. Returns false when nothing changed.
    pub fn add_host(&self, scope: Scope, name: &str, url: &str) -> bool {
        let url = normalize_url(url);
        if name.is_empty() || url.is_empty() {
            tracing::warn!(scope = %scope, name = %name, url = %url, "Ignoring registration with empty name or url");
            return false;
        }

        let changed = self.update(|table| table.insert(scope, name, &url));
        if changed {
            self.notify(&[Change::Added(scope, name.to_string(), url)]);
        }
        changed
    }

    /// Unregister `url` from `name`. Returns false when nothing changed.
    pub fn remove_host(&self, scope: Scope, name: &str, url: &str) -> bool {
        let url = normalize_url(url);
        let changed = self.update(|table| table.remove(scope, name, &url));
        if changed {
            self.notify(&[Change::Removed(scope, name.to_string(), url)]);
        }
        changed
    }

    pub fn add_container_host(&self, container: &str, url: &str) -> bool {
        self.add_host(Scope::Container, container, url)
    }

    pub fn add_server_host(&self, server: &str, url: &str) -> bool {
        self.add_host(Scope::Server, server, url)
    }

    pub fn remove_container_host(&self, container: &str, url: &str) -> bool {
        self.remove_host(Scope::Container, container, url)
    }

    pub fn remove_server_host(&self, server: &str, url: &str) -> bool {
        self.remove_host(Scope::Server, server, url)
    }

    /// Replace this instance's contents with `other`'s, keeping identity.
    ///
    /// Readers observe either the old table or the new one, never a mix.
    /// Listeners receive the per-entry differences followed by
    /// `on_configuration_reloaded`.
    pub fn reload_from(&self, other: &Configuration) {
        self.reload_from_table(other.snapshot().as_ref().clone());
    }

    pub fn reload_from_table(&self, updated: RoutingTable) {
        let mut changes = {
            let _guard = self.lock_writes();
            let current = self.table.load_full();

            let mut changes: Vec<Change> = current
                .missing_from(&updated)
                .into_iter()
                .map(|(scope, name, url)| Change::Removed(scope, name, url))
                .collect();
            changes.extend(
                updated
                    .missing_from(&current)
                    .into_iter()
                    .map(|(scope, name, url)| Change::Added(scope, name, url)),
            );

            self.table.store(Arc::new(updated));
            changes
        };

        tracing::debug!(changes = changes.len(), "Configuration reloaded");
        changes.push(Change::Reloaded);
        self.notify(&changes);
    }

    /// Drop everything routed to the server whose base URL prefixes
    /// `request_url`, returning what was removed so it can be restored.
    pub fn remove_unavailable_server(&self, request_url: &str) -> FailedHost {
        let (failed, changes) = {
            let _guard = self.lock_writes();
            let current = self.table.load_full();
            let mut table = current.as_ref().clone();

            let server_match = longest_base(current.hosts_per_server(), request_url);
            let container_url = longest_base(current.hosts_per_container(), request_url)
                .map(|(_, url)| url);
            let server_url = server_match
                .as_ref()
                .map(|(_, url)| url.clone())
                .or(container_url);

            let Some(server_url) = server_url else {
                return FailedHost::default();
            };

            let mut changes = Vec::new();
            let server_id = server_match.map(|(id, _)| id);
            if let Some(id) = &server_id {
                if table.remove(Scope::Server, id, &server_url) {
                    changes.push(Change::Removed(Scope::Server, id.clone(), server_url.clone()));
                }
            }

            let mut containers: Vec<String> = current
                .hosts_per_container()
                .iter()
                .filter(|(_, urls)| urls.contains(&server_url))
                .map(|(name, _)| name.clone())
                .collect();
            containers.sort();
            for container in &containers {
                table.remove(Scope::Container, container, &server_url);
                changes.push(Change::Removed(
                    Scope::Container,
                    container.clone(),
                    server_url.clone(),
                ));
            }

            self.table.store(Arc::new(table));
            (
                FailedHost {
                    server_id,
                    server_url: Some(server_url),
                    containers,
                },
                changes,
            )
        };

        self.notify(&changes);
        failed
    }

    pub fn add_listener(&self, listener: Arc<dyn ConfigurationListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ConfigurationListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn update<F>(&self, mutate: F) -> bool
    where
        F: FnOnce(&mut RoutingTable) -> bool,
    {
        let _guard = self.lock_writes();
        let mut table = self.table.load().as_ref().clone();
        let changed = mutate(&mut table);
        if changed {
            self.table.store(Arc::new(table));
        }
        changed
    }

    fn notify(&self, changes: &[Change]) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if listeners.is_empty() {
            return;
        }

        for change in changes {
            for listener in &listeners {
                match change {
                    Change::Added(Scope::Container, name, url) => listener.on_container_added(name, url),
                    Change::Added(Scope::Server, name, url) => listener.on_server_added(name, url),
                    Change::Removed(Scope::Container, name, url) => listener.on_container_removed(name, url),
                    Change::Removed(Scope::Server, name, url) => listener.on_server_removed(name, url),
                    Change::Reloaded => listener.on_configuration_reloaded(),
                }
            }
        }
    }
}

/// `host` is the base of `request_url` when it matches exactly or is followed
/// by a path, query or fragment separator.
fn is_base_of(host: &str, request_url: &str) -> bool {
    match request_url.strip_prefix(host) {
        Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
        None => false,
    }
}

fn longest_base(map: &HostMap, request_url: &str) -> Option<(String, String)> {
    map.iter()
        .flat_map(|(name, urls)| urls.iter().map(move |url| (name, url)))
        .filter(|(_, url)| is_base_of(url, request_url))
        .max_by(|a, b| a.1.len().cmp(&b.1.len()).then_with(|| b.0.cmp(a.0)))
        .map(|(name, url)| (name.clone(), url.clone()))
}
