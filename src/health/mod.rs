//! Health of registered backend servers.
//!
//! # Data Flow
//! ```text
//! Dispatch layer observes a dead server:
//!     → FailedHostMonitor::report_unavailable(url)
//!     → ConfigurationManager::disconnect_failed_host (remove + persist)
//!
//! Periodic timer (recovery.rs):
//!     → Check each disconnected server
//!     → On success: reconnect_failed_host (restore + persist)
//!     → Past the attempt limit: forget the server
//! ```
//!
//! # Design Decisions
//! - Removal is keyed on the server base URL so every container it served
//!   is restored together
//! - The check loop stops on the process shutdown signal

pub mod recovery;

pub use recovery::FailedHostMonitor;
