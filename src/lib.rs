//! Dynamic routing registry for a router in front of backend servers.

pub mod admin;
pub mod client;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod resilience;

pub use client::{RegistrationClient, RouterConnectionObserver};
pub use config::{ConfigRepository, ConfigurationMarshaller, FileRepository};
pub use lifecycle::Shutdown;
pub use registry::{Configuration, ConfigurationManager, RoutingTable, Scope};
