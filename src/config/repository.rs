//! On-disk routing repository.
//!
//! # Responsibilities
//! - Load the routing configuration at startup
//! - Persist the full configuration on demand
//! - Own the optional hot-reload watcher
//!
//! # Design Decisions
//! - Startup never fails because of the routing file: missing or malformed
//!   files yield an empty configuration
//! - Persist overwrites the whole file, then stamps its mtime explicitly so
//!   coarse timestamp filesystems still fire the watcher
//! - Admin writes and watcher reloads share one lock, so a reload always
//!   reads the file the last admin persist produced

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use crate::config::marshaller::{ConfigurationMarshaller, MalformedConfigError};
use crate::config::watcher::ConfigFileWatcher;
use crate::observability::metrics;
use crate::registry::Configuration;

/// Fixed name of the routing file inside the repository directory.
pub const CONFIG_FILE_NAME: &str = "router-config.json";

/// Errors raised by repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Writing the routing file failed. The in-memory state stays authoritative.
    #[error("failed to persist {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Malformed(#[from] MalformedConfigError),

    /// The platform watch could not be created; hot reload is disabled.
    #[error("failed to set up config file watch: {0}")]
    WatchSetup(#[from] notify::Error),
}

/// Storage for the routing configuration.
pub trait ConfigRepository: Send + Sync {
    /// Load the configuration, falling back to an empty one.
    fn load(&self) -> Arc<Configuration>;

    /// Write the full configuration.
    fn persist(&self, configuration: &Configuration) -> Result<(), RepositoryError>;

    /// Persist an empty configuration.
    fn clean(&self) -> Result<(), RepositoryError> {
        self.persist(&Configuration::new())
    }

    /// Stop background work. Idempotent.
    fn close(&self);

    /// Exclusion shared by every writer of the stored configuration and by
    /// the reload path. Writers hold it across mutate-then-persist.
    fn sync_lock(&self) -> Arc<Mutex<()>>;
}

/// Hot-reload settings for a [`FileRepository`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotReload {
    /// Upper bound on how long the watcher blocks before re-checking its stop flag.
    pub poll: Duration,
}

/// Repository backed by `CONFIG_FILE_NAME` in a directory.
pub struct FileRepository {
    path: PathBuf,
    marshaller: ConfigurationMarshaller,
    hot_reload: Option<HotReload>,
    watcher: Mutex<Option<ConfigFileWatcher>>,
    sync: Arc<Mutex<()>>,
}

impl FileRepository {
    /// Repository without hot reload.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CONFIG_FILE_NAME),
            marshaller: ConfigurationMarshaller::new(),
            hot_reload: None,
            watcher: Mutex::new(None),
            sync: Arc::new(Mutex::new(())),
        }
    }

    /// Enable the config file watcher on subsequent `load` calls.
    pub fn with_hot_reload(mut self, hot_reload: HotReload) -> Self {
        self.hot_reload = Some(hot_reload);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(ConfigFileWatcher::is_running)
    }

    /// Strict read: parse the file, reporting why it could not be used.
    pub fn read(&self) -> Result<Option<Configuration>, RepositoryError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(RepositoryError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(Some(self.marshaller.unmarshall_reader(BufReader::new(file))?))
    }

    fn start_watcher(&self, configuration: &Arc<Configuration>, hot_reload: HotReload) {
        let mut slot = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.stop();
        }

        match ConfigFileWatcher::start(
            &self.path,
            configuration.clone(),
            self.marshaller,
            self.sync.clone(),
            hot_reload.poll,
        ) {
            Ok(watcher) => *slot = Some(watcher),
            Err(e) => {
                let e = RepositoryError::from(e);
                tracing::warn!(path = ?self.path, error = %e, "Hot reload disabled");
            }
        }
    }

    fn write_file(&self, text: &str) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(text.as_bytes())?;
        writer.flush()?;

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        file.set_modified(SystemTime::now())?;
        Ok(())
    }
}

impl ConfigRepository for FileRepository {
    fn load(&self) -> Arc<Configuration> {
        let configuration = match self.read() {
            Ok(Some(configuration)) => {
                tracing::info!(path = ?self.path, "Routing configuration loaded");
                configuration
            }
            Ok(None) => {
                tracing::info!(path = ?self.path, "No routing configuration found, starting empty");
                Configuration::new()
            }
            Err(e) => {
                tracing::error!(path = ?self.path, error = %e, "Unusable routing configuration, starting empty");
                Configuration::new()
            }
        };

        let configuration = Arc::new(configuration);
        if let Some(hot_reload) = self.hot_reload {
            self.start_watcher(&configuration, hot_reload);
        }
        configuration
    }

    fn persist(&self, configuration: &Configuration) -> Result<(), RepositoryError> {
        let text = self.marshaller.marshall(configuration);
        self.write_file(&text).map_err(|source| {
            metrics::record_persist_failure();
            RepositoryError::Persistence {
                path: self.path.clone(),
                source,
            }
        })?;
        tracing::debug!(path = ?self.path, bytes = text.len(), "Routing configuration persisted");
        Ok(())
    }

    fn close(&self) {
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watcher) = watcher {
            watcher.stop();
        }
    }

    fn sync_lock(&self) -> Arc<Mutex<()>> {
        self.sync.clone()
    }
}

impl Drop for FileRepository {
    fn drop(&mut self) {
        self.close();
    }
}
