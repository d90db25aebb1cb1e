//! Process settings definitions.
//!
//! This module defines the settings for the router process and for the
//! registration client embedded in backend servers. All types derive Serde
//! traits for deserialization from TOML files; every field has a default.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::repository::HotReload;
use crate::resilience::retries::RetryPolicy;

/// Root settings for the router process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterSettings {
    /// Admin listener.
    pub listener: ListenerSettings,

    /// Routing file location and hot reload.
    pub repository: RepositorySettings,

    /// Recovery of servers taken out of rotation.
    pub recovery: RecoverySettings,

    /// Logging and metrics.
    pub observability: ObservabilitySettings,
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerSettings {
    /// Bind address (e.g., "0.0.0.0:9000").
    pub bind_address: String,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
        }
    }
}

/// Routing repository settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositorySettings {
    /// Directory holding `router-config.json`.
    pub dir: String,

    /// Apply external edits of the routing file without a restart.
    pub watcher_enabled: bool,

    /// Longest the watcher blocks between stop-flag checks, in milliseconds.
    pub watcher_poll_ms: u64,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
            watcher_enabled: false,
            watcher_poll_ms: 2000,
        }
    }
}

impl RepositorySettings {
    pub fn hot_reload(&self) -> Option<HotReload> {
        self.watcher_enabled.then(|| HotReload {
            poll: Duration::from_millis(self.watcher_poll_ms),
        })
    }
}

/// Failed-host recovery settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoverySettings {
    /// Seconds between pings of disconnected servers.
    pub attempt_interval_secs: u64,

    /// Give up on a server after this many pings. Unlimited when unset.
    pub attempt_limit: Option<u32>,

    /// Ping timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            attempt_interval_secs: 10,
            attempt_limit: None,
            timeout_ms: 5000,
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Default tracing filter, overridden by `RUST_LOG`.
    pub log_filter: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_filter: "router_registry=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Settings of the registration client running inside a backend server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationSettings {
    /// Identity of this backend server.
    pub server_id: String,

    /// Base URL routers should forward to.
    pub server_url: String,

    /// Router base URLs. Normalized when the client is built.
    pub routers: Vec<String>,

    /// Delay before the first retry, in milliseconds.
    pub retry_interval_ms: u64,

    /// Attempts per (event, router) before giving up. Includes the first call.
    pub max_attempts: u32,

    /// When set, retries back off exponentially up to this delay.
    pub max_backoff_ms: Option<u64>,

    /// Timeout of a single admin call, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            server_id: "default-server".to_string(),
            server_url: "http://localhost:8080".to_string(),
            routers: Vec::new(),
            retry_interval_ms: 10_000,
            max_attempts: 6,
            max_backoff_ms: None,
            request_timeout_ms: 5000,
        }
    }
}

impl RegistrationSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        let interval = Duration::from_millis(self.retry_interval_ms);
        match self.max_backoff_ms {
            Some(max) => RetryPolicy::exponential(interval, Duration::from_millis(max), self.max_attempts),
            None => RetryPolicy::fixed(interval, self.max_attempts),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
