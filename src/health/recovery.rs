//! Recovery of servers taken out of rotation.
//!
//! # Responsibilities
//! - Remove a server's endpoints when the dispatch path reports it unavailable
//! - Periodically check disconnected servers
//! - Restore every removed entry once a server answers again

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time;

use crate::config::schema::RecoverySettings;
use crate::lifecycle::ShutdownSignal;
use crate::registry::{ConfigurationManager, FailedHost};

#[derive(Debug, Clone)]
struct FailedHostEntry {
    host: FailedHost,
    attempts: u32,
}

enum CheckOutcome {
    Recovered,
    StillDown,
    GaveUp,
}

pub struct FailedHostMonitor {
    manager: Arc<ConfigurationManager>,
    settings: RecoverySettings,
    client: reqwest::Client,
    failed: Mutex<Vec<FailedHostEntry>>,
}

impl FailedHostMonitor {
    pub fn new(
        manager: Arc<ConfigurationManager>,
        settings: RecoverySettings,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;

        Ok(Self {
            manager,
            settings,
            client,
            failed: Mutex::new(Vec::new()),
        })
    }

    /// Take the server behind `url` out of rotation and start probing it.
    pub fn report_unavailable(&self, url: &str) -> FailedHost {
        let host = self.manager.disconnect_failed_host(url);
        if !host.is_empty() {
            let mut failed = self.failed.lock().unwrap_or_else(PoisonError::into_inner);
            let known = failed
                .iter()
                .any(|entry| entry.host.server_url == host.server_url);
            if !known {
                failed.push(FailedHostEntry {
                    host: host.clone(),
                    attempts: 0,
                });
            }
        }
        host
    }

    /// Servers still waiting to come back.
    pub fn pending(&self) -> usize {
        self.failed.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub async fn run(self: Arc<Self>, mut shutdown: ShutdownSignal) {
        tracing::info!(
            interval = self.settings.attempt_interval_secs,
            limit = ?self.settings.attempt_limit,
            "Failed host monitor starting"
        );

        let interval = Duration::from_secs(self.settings.attempt_interval_secs);
        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.wait() => {
                    tracing::info!("Failed host monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Check every failed host once.
    pub async fn check_all(&self) {
        let entries = self
            .failed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if entries.is_empty() {
            return;
        }

        let mut results = Vec::with_capacity(entries.len());
        for entry in &entries {
            let outcome = self.check_host(entry).await;
            if let CheckOutcome::Recovered = outcome {
                let manager = self.manager.clone();
                let host = entry.host.clone();
                if let Err(e) =
                    tokio::task::spawn_blocking(move || manager.reconnect_failed_host(&host)).await
                {
                    tracing::error!(error = %e, "Reconnect task failed");
                }
            }
            results.push((entry.host.server_url.clone(), outcome));
        }

        let mut failed = self.failed.lock().unwrap_or_else(PoisonError::into_inner);
        for (url, outcome) in results {
            let Some(pos) = failed.iter().position(|e| e.host.server_url == url) else {
                continue;
            };
            match outcome {
                CheckOutcome::Recovered | CheckOutcome::GaveUp => {
                    failed.remove(pos);
                }
                CheckOutcome::StillDown => failed[pos].attempts += 1,
            }
        }
    }

    async fn check_host(&self, entry: &FailedHostEntry) -> CheckOutcome {
        let Some(url) = entry.host.server_url.as_deref() else {
            return CheckOutcome::GaveUp;
        };

        if self.settings.attempt_limit == Some(entry.attempts) {
            tracing::info!(
                url = %url,
                limit = entry.attempts,
                "Host has reached reconnect attempts limit, giving up"
            );
            return CheckOutcome::GaveUp;
        }

        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => CheckOutcome::Recovered,
            Ok(response) => {
                tracing::debug!(url = %url, status = %response.status(), "Host is still not available");
                CheckOutcome::StillDown
            }
            Err(e) => {
                tracing::debug!(
                    url = %url,
                    error = %e,
                    retry_in_secs = self.settings.attempt_interval_secs,
                    "Host is still not available"
                );
                CheckOutcome::StillDown
            }
        }
    }
}
