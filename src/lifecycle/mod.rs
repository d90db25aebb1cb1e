//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load settings → Load routing file → Start watcher → Start admin listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Stop watcher → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - One `Shutdown` coordinator per process (or per registration client)
//! - Late subscribers still observe a shutdown that already happened

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
