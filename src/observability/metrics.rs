//! Metrics collection and exposition.
//!
//! # Metrics
//! - `registry_admin_operations_total` (counter): admin add/remove by op, scope
//! - `registry_reloads_total` (counter): watcher reloads by outcome
//! - `registry_persist_failures_total` (counter): failed routing file writes
//! - `registry_deliveries_total` (counter): registration deliveries by outcome
//! - `registry_registered_hosts` (gauge): (name, url) pairs per scope
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   exporter every call is a no-op, so library users and tests pay nothing
//! - The Prometheus exporter is only installed by the router binary

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::registry::{RoutingTable, Scope};

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_admin_operation(op: &'static str, scope: &'static str) {
    metrics::counter!("registry_admin_operations_total", "op" => op, "scope" => scope).increment(1);
}

pub fn record_reload(outcome: &'static str) {
    metrics::counter!("registry_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_persist_failure() {
    metrics::counter!("registry_persist_failures_total").increment(1);
}

pub fn record_delivery(outcome: &'static str) {
    metrics::counter!("registry_deliveries_total", "outcome" => outcome).increment(1);
}

pub fn set_registered_hosts(scope: &'static str, count: usize) {
    metrics::gauge!("registry_registered_hosts", "scope" => scope).set(count as f64);
}

/// Refresh the per-scope host gauges from `table`.
pub fn record_registered_hosts(table: &RoutingTable) {
    for scope in Scope::ALL {
        set_registered_hosts(scope.as_str(), table.host_count(scope));
    }
}
