//! Dynamic routing registry.
//!
//! # Data Flow
//! ```text
//! backend server lifecycle event
//!     → client (POST /admin/add | /admin/remove)
//!     → admin handlers
//!     → manager.rs (mutate Configuration, then persist)
//!     → config::repository (write router-config.json)
//!
//! operator edits router-config.json
//!     → config::watcher detects change
//!     → Configuration::reload_from (same instance, new snapshot)
//!
//! proxy dispatch
//!     → Configuration::snapshot() (lock-free read)
//! ```
//!
//! # Design Decisions
//! - `Scope` is a tagged variant so container and server names cannot be
//!   confused at the type level
//! - URL sets have set semantics; every mutation is idempotent
//! - One `Configuration` per router, shared via `Arc` for the process lifetime

pub mod configuration;
pub mod endpoint;
pub mod listener;
pub mod manager;
pub mod request;
pub mod scope;
pub mod table;

pub use configuration::{Configuration, FailedHost};
pub use listener::ConfigurationListener;
pub use manager::{ApplyOutcome, ConfigurationManager};
pub use request::{Operation, RegistrationRequest};
pub use scope::Scope;
pub use table::{HostMap, RoutingTable};
