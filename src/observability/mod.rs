//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape), router binary only
//! ```
//!
//! # Design Decisions
//! - Structured fields (`scope`, `name`, `url`, `router`) on every registry event
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
