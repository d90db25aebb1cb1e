//! Immutable routing snapshot.

use std::collections::{HashMap, HashSet};

use crate::registry::Scope;

/// Logical name -> set of endpoint URLs.
pub type HostMap = HashMap<String, HashSet<String>>;

/// One consistent view of both scopes.
///
/// Never holds an empty URL set: a name without endpoints is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    containers: HostMap,
    servers: HostMap,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw maps, dropping empty sets.
    pub fn from_maps(containers: HostMap, servers: HostMap) -> Self {
        let mut table = Self { containers, servers };
        table.containers.retain(|_, urls| !urls.is_empty());
        table.servers.retain(|_, urls| !urls.is_empty());
        table
    }

    pub fn hosts_per_container(&self) -> &HostMap {
        &self.containers
    }

    pub fn hosts_per_server(&self) -> &HostMap {
        &self.servers
    }

    /// The map belonging to `scope`.
    pub fn scope(&self, scope: Scope) -> &HostMap {
        match scope {
            Scope::Container => &self.containers,
            Scope::Server => &self.servers,
        }
    }

    fn scope_mut(&mut self, scope: Scope) -> &mut HostMap {
        match scope {
            Scope::Container => &mut self.containers,
            Scope::Server => &mut self.servers,
        }
    }

    /// Endpoints registered for `name`, empty when absent.
    pub fn hosts(&self, scope: Scope, name: &str) -> Vec<String> {
        self.scope(scope)
            .get(name)
            .map(|urls| urls.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, scope: Scope, name: &str, url: &str) -> bool {
        self.scope(scope)
            .get(name)
            .is_some_and(|urls| urls.contains(url))
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty() && self.servers.is_empty()
    }

    /// Number of (name, url) pairs in `scope`.
    pub fn host_count(&self, scope: Scope) -> usize {
        self.scope(scope).values().map(HashSet::len).sum()
    }

    /// Returns true when the url was not yet present.
    pub(crate) fn insert(&mut self, scope: Scope, name: &str, url: &str) -> bool {
        self.scope_mut(scope)
            .entry(name.to_string())
            .or_default()
            .insert(url.to_string())
    }

    /// Returns true when the url was present.
    pub(crate) fn remove(&mut self, scope: Scope, name: &str, url: &str) -> bool {
        let map = self.scope_mut(scope);
        let Some(urls) = map.get_mut(name) else {
            return false;
        };
        let removed = urls.remove(url);
        if urls.is_empty() {
            map.remove(name);
        }
        removed
    }

    /// Entries present in `self` but missing from `other`.
    pub(crate) fn missing_from(&self, other: &RoutingTable) -> Vec<(Scope, String, String)> {
        let mut missing = Vec::new();
        for scope in Scope::ALL {
            for (name, urls) in self.scope(scope) {
                for url in urls {
                    if !other.contains(scope, name, url) {
                        missing.push((scope, name.clone(), url.clone()));
                    }
                }
            }
        }
        missing
    }
}
