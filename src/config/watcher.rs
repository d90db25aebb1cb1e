//! Routing file watcher for hot reload.
//!
//! # Responsibilities
//! - Watch the repository directory (not the file, so replace-by-rename
//!   editors are observed)
//! - Filter events down to the routing file name
//! - Re-read and apply the file into the live `Configuration` in place
//!
//! # Design Decisions
//! - Runs on a dedicated thread; waits are bounded by the poll interval so a
//!   stop request is observed promptly
//! - A file that fails to parse is ignored and the previous state is kept
//! - Read, parse and apply run under the repository's sync lock, the same
//!   one admin writers hold across mutate-then-persist
//! - Nothing in the loop can terminate the process; every error is logged

use notify::event::{AccessKind, AccessMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::marshaller::ConfigurationMarshaller;
use crate::observability::metrics;
use crate::registry::Configuration;

/// Background loop applying on-disk edits to a live configuration.
pub struct ConfigFileWatcher {
    path: PathBuf,
    stop: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ConfigFileWatcher {
    /// Register the directory watch and start the loop.
    ///
    /// Fails only if the platform watch cannot be created; the caller then
    /// runs without hot reload.
    pub fn start(
        path: &Path,
        configuration: Arc<Configuration>,
        marshaller: ConfigurationMarshaller,
        sync: Arc<Mutex<()>>,
        poll: Duration,
    ) -> Result<Self, notify::Error> {
        let dir = watch_dir(path);
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            Config::default().with_poll_interval(poll),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let stop = Arc::new(AtomicBool::new(false));
        let worker = WatchLoop {
            path: path.to_path_buf(),
            configuration,
            marshaller,
            sync,
            poll,
            stop: stop.clone(),
        };

        let handle = std::thread::Builder::new()
            .name("config-file-watcher".into())
            .spawn(move || worker.run(watcher, rx))
            .map_err(notify::Error::io)?;

        tracing::info!(path = ?path, dir = ?dir, "Config file watcher started");
        Ok(Self {
            path: path.to_path_buf(),
            stop,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Ask the loop to exit and wait for it. Idempotent.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!(path = ?self.path, "Config file watcher thread panicked");
            }
            tracing::info!(path = ?self.path, "Config file watcher stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ConfigFileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

struct WatchLoop {
    path: PathBuf,
    configuration: Arc<Configuration>,
    marshaller: ConfigurationMarshaller,
    sync: Arc<Mutex<()>>,
    poll: Duration,
    stop: Arc<AtomicBool>,
}

impl WatchLoop {
    fn run(self, watcher: RecommendedWatcher, rx: mpsc::Receiver<notify::Result<Event>>) {
        while !self.stop.load(Ordering::SeqCst) {
            match rx.recv_timeout(self.poll) {
                Ok(Ok(event)) => {
                    if self.is_relevant(&event) {
                        // Coalesce the burst an editor or a persist produces.
                        while let Ok(Ok(_)) = rx.try_recv() {}
                        self.reload();
                    }
                }
                Ok(Err(e)) => tracing::warn!(error = %e, "Config watch error"),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!(path = ?self.path, "Config watch channel closed, stopping watcher");
                    break;
                }
            }
        }
        drop(watcher);
    }

    fn is_relevant(&self, event: &Event) -> bool {
        let kind_matches = matches!(
            event.kind,
            EventKind::Create(_)
                | EventKind::Modify(_)
                | EventKind::Access(AccessKind::Close(AccessMode::Write))
                | EventKind::Any
        );
        let Some(file_name) = self.path.file_name() else {
            return false;
        };
        let relevant = kind_matches
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name));
        if !relevant {
            tracing::trace!(kind = ?event.kind, paths = ?event.paths, "Ignoring unrelated event");
        }
        relevant
    }

    fn reload(&self) {
        let _guard = self.sync.lock().unwrap_or_else(PoisonError::into_inner);
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Failed to read config file, keeping current configuration");
                metrics::record_reload("io_error");
                return;
            }
        };

        match self.marshaller.unmarshall(&content) {
            Ok(updated) => {
                self.configuration.reload_from(&updated);
                metrics::record_reload("applied");
                metrics::record_registered_hosts(&self.configuration.snapshot());
                tracing::info!(path = ?self.path, "Config file change applied");
            }
            Err(e) => {
                metrics::record_reload("malformed");
                tracing::error!(path = ?self.path, error = %e, "Failed to parse config file, keeping current configuration");
            }
        }
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
