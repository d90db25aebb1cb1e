//! Registration client embedded in backend servers.
//!
//! # Responsibilities
//! - Announce units (and the server itself) to every configured router
//! - Retry each (event, router) delivery independently
//! - Report the settled outcome of each delivery to the observer
//!
//! # Design Decisions
//! - One task per (event, router); a dead router never delays the others
//! - Events are independent and unordered: a later event for the same unit
//!   does not cancel an earlier one still retrying
//! - `close` abandons in-flight deliveries without notifying the observer
//! - Lifecycle hooks are plain functions usable from any thread; tasks run
//!   on the runtime captured at construction

use reqwest::header::ACCEPT;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::client::introspection::{ContainerDescriptor, ServerIntrospection};
use crate::client::observer::RouterConnectionObserver;
use crate::config::schema::RegistrationSettings;
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::observability::metrics;
use crate::registry::endpoint::normalize_url;
use crate::registry::{Operation, RegistrationRequest};
use crate::resilience::RetryPolicy;

/// Errors raised by the registration client.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// The admin call could not be completed (connect error, timeout).
    #[error("request to router {router} failed: {source}")]
    Transport {
        router: String,
        #[source]
        source: reqwest::Error,
    },

    /// The router answered with a non-2xx status.
    #[error("router {router} answered {status}")]
    Status {
        router: String,
        status: reqwest::StatusCode,
    },

    #[error("registration client must be created inside a Tokio runtime")]
    NoRuntime,

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// How one (event, router) delivery settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Exhausted { attempts: u32 },
    /// The client was closed first; the observer was not called.
    Abandoned,
}

/// Handle on a spawned delivery.
pub type Delivery = JoinHandle<DeliveryOutcome>;

struct Dispatcher {
    http: reqwest::Client,
    observer: Arc<dyn RouterConnectionObserver>,
    policy: RetryPolicy,
}

/// Notifies routers about this server's lifecycle.
pub struct RegistrationClient {
    server_id: String,
    server_url: String,
    routers: Vec<String>,
    dispatcher: Arc<Dispatcher>,
    shutdown: Shutdown,
    runtime: Handle,
}

impl RegistrationClient {
    /// Build a client from settings. Must be called within a Tokio runtime.
    pub fn new(
        settings: &RegistrationSettings,
        observer: Arc<dyn RouterConnectionObserver>,
    ) -> Result<Self, RegistrationError> {
        let runtime = Handle::try_current().map_err(|_| RegistrationError::NoRuntime)?;
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(RegistrationError::Client)?;

        let mut routers: Vec<String> = Vec::new();
        for router in settings.routers.iter().map(|r| normalize_url(r)) {
            if !router.is_empty() && !routers.contains(&router) {
                routers.push(router);
            }
        }

        Ok(Self {
            server_id: settings.server_id.clone(),
            server_url: normalize_url(&settings.server_url),
            routers,
            dispatcher: Arc::new(Dispatcher {
                http,
                observer,
                policy: settings.retry_policy(),
            }),
            shutdown: Shutdown::new(),
            runtime,
        })
    }

    /// Normalized router base URLs.
    pub fn routers(&self) -> &[String] {
        &self.routers
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Register this server under its id.
    pub fn after_server_started(&self) -> Vec<Delivery> {
        let request = RegistrationRequest::server(&self.server_id, &self.server_url);
        self.dispatch(Operation::Add, request)
    }

    /// Register `container` (id and alias) at this server's URL.
    pub fn after_container_started(&self, container: &ContainerDescriptor) -> Vec<Delivery> {
        self.container_event(Operation::Add, container)
    }

    /// Unregister `container` (id and alias) from this server's URL.
    pub fn after_container_stopped(&self, container: &ContainerDescriptor) -> Vec<Delivery> {
        self.container_event(Operation::Remove, container)
    }

    /// Unregister every running unit, then the server itself.
    pub fn before_server_stopped(&self, server: &dyn ServerIntrospection) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        for container in server.active_containers() {
            deliveries.extend(self.container_event(Operation::Remove, &container));
        }
        let request = RegistrationRequest::server(&self.server_id, &self.server_url);
        deliveries.extend(self.dispatch(Operation::Remove, request));
        deliveries
    }

    /// The server is down; stop all pending work.
    pub fn after_server_stopped(&self) {
        self.close();
    }

    /// Abandon in-flight deliveries and ignore further events. Idempotent.
    pub fn close(&self) {
        if !self.shutdown.is_triggered() {
            tracing::debug!("Shutting down router registration deliveries");
            self.shutdown.trigger();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_triggered()
    }

    fn container_event(&self, operation: Operation, container: &ContainerDescriptor) -> Vec<Delivery> {
        container
            .names()
            .into_iter()
            .flat_map(|name| {
                let request = RegistrationRequest::container(name, &self.server_url);
                self.dispatch(operation, request)
            })
            .collect()
    }

    fn dispatch(&self, operation: Operation, request: RegistrationRequest) -> Vec<Delivery> {
        if self.is_closed() {
            tracing::debug!(op = %operation, name = %request.name, "Registration client closed, skipping");
            return Vec::new();
        }
        if self.routers.is_empty() {
            tracing::debug!("Router url not given, skipping");
            return Vec::new();
        }

        self.routers
            .iter()
            .map(|router| {
                let task = DeliveryTask {
                    dispatcher: self.dispatcher.clone(),
                    router: router.clone(),
                    operation,
                    request: request.clone(),
                };
                self.runtime.spawn(task.run(self.shutdown.subscribe()))
            })
            .collect()
    }
}

impl Drop for RegistrationClient {
    fn drop(&mut self) {
        self.close();
    }
}

struct DeliveryTask {
    dispatcher: Arc<Dispatcher>,
    router: String,
    operation: Operation,
    request: RegistrationRequest,
}

impl DeliveryTask {
    async fn run(self, mut shutdown: ShutdownSignal) -> DeliveryOutcome {
        let endpoint = format!("{}{}", self.router, self.operation.path());
        let policy = self.dispatcher.policy;
        let mut failed = 0u32;

        loop {
            let result = tokio::select! {
                result = self.send(&endpoint) => result,
                _ = shutdown.wait() => return self.abandon(failed),
            };

            let error = match result {
                Ok(()) => {
                    tracing::info!(
                        op = %self.operation,
                        scope = %self.request.scope,
                        name = %self.request.name,
                        url = %self.request.url,
                        router = %self.router,
                        "Registration delivered"
                    );
                    metrics::record_delivery("delivered");
                    self.dispatcher.observer.on_success(&self.router);
                    return DeliveryOutcome::Delivered { attempts: failed + 1 };
                }
                Err(e) => e,
            };

            failed += 1;
            match policy.next_delay(failed) {
                Some(delay) => {
                    tracing::warn!(
                        router = %self.router,
                        error = %error,
                        attempt = failed,
                        retry_in_ms = delay.as_millis() as u64,
                        "Failed at sending request to router, next attempt scheduled"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.wait() => return self.abandon(failed),
                    }
                }
                None => {
                    tracing::warn!(
                        router = %self.router,
                        error = %error,
                        attempts = failed,
                        op = %self.operation,
                        name = %self.request.name,
                        "Giving up on router after repeated failures"
                    );
                    metrics::record_delivery("exhausted");
                    self.dispatcher.observer.on_failure(&self.router);
                    return DeliveryOutcome::Exhausted { attempts: failed };
                }
            }
        }
    }

    async fn send(&self, endpoint: &str) -> Result<(), RegistrationError> {
        let response = self
            .dispatcher
            .http
            .post(endpoint)
            .header(ACCEPT, "application/json")
            .json(&self.request)
            .send()
            .await
            .map_err(|source| RegistrationError::Transport {
                router: self.router.clone(),
                source,
            })?;

        let status = response.status();
        tracing::debug!(url = %endpoint, status = %status, "Router responded");
        if !status.is_success() {
            return Err(RegistrationError::Status {
                router: self.router.clone(),
                status,
            });
        }
        Ok(())
    }

    fn abandon(&self, failed: u32) -> DeliveryOutcome {
        tracing::debug!(router = %self.router, attempts = failed, name = %self.request.name, "Delivery abandoned on close");
        metrics::record_delivery("abandoned");
        DeliveryOutcome::Abandoned
    }
}
