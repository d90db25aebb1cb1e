//! Configuration persistence and process settings.
//!
//! # Data Flow
//! ```text
//! router-config.json
//!     → repository.rs (read at startup, overwrite on persist)
//!     → marshaller.rs (JSON ↔ Configuration)
//!     → registry::Configuration (live, shared via Arc)
//!
//! On external edit:
//!     watcher.rs detects change in the repository directory
//!     → marshaller.rs parses the new file
//!     → Configuration::reload_from (in place, same instance)
//!     → parse failure keeps the current state
//!
//! Process settings (TOML):
//!     loader.rs (file + env overrides) → validation.rs → schema.rs types
//! ```
//!
//! # Design Decisions
//! - The routing file never prevents startup; problems degrade to empty
//! - Settings have defaults for every field to allow minimal files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod marshaller;
pub mod repository;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use marshaller::{ConfigurationMarshaller, MalformedConfigError};
pub use repository::{ConfigRepository, FileRepository, HotReload, RepositoryError, CONFIG_FILE_NAME};
pub use schema::{RegistrationSettings, RouterSettings};
pub use watcher::ConfigFileWatcher;
