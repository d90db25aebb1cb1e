//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Admin call to a router:
//!     → request timeout (per call)
//!     → On failure: retries.rs decides whether another attempt is allowed
//!     → backoff.rs computes the delay (exponential schedules only)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - Retries are bounded by attempt count
//! - Jittered backoff prevents many servers retrying in lockstep

pub mod backoff;
pub mod retries;

pub use retries::RetryPolicy;
