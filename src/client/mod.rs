//! Router registration from backend servers.
//!
//! # Data Flow
//! ```text
//! backend server lifecycle hook
//!     → registration.rs (one task per router)
//!     → POST {router}/admin/add | /admin/remove
//!     → on failure: resilience::RetryPolicy decides the next attempt
//!     → observer.rs (on_success / on_failure, once per event and router)
//! ```
//!
//! # Design Decisions
//! - Router URLs are normalized once at construction
//! - A router being unreachable never blocks the server's own lifecycle
//! - Server introspection is a trait supplied by the embedding server

pub mod introspection;
pub mod observer;
pub mod registration;

pub use introspection::{ContainerDescriptor, ServerIntrospection};
pub use observer::{ChannelObserver, NoopObserver, RouterConnectionObserver, RouterEvent};
pub use registration::{Delivery, DeliveryOutcome, RegistrationClient, RegistrationError};
