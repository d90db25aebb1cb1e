//! Delivery outcome observers.

use std::time::Instant;
use tokio::sync::mpsc;

/// Notified once per (event, router) when a delivery settles.
///
/// Called from the retry task's thread, never the caller's; implementations
/// must be thread-safe and should not block.
pub trait RouterConnectionObserver: Send + Sync {
    /// The router accepted the registration.
    fn on_success(&self, router: &str);

    /// Retries for this event are exhausted.
    fn on_failure(&self, router: &str);
}

/// Ignores every outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RouterConnectionObserver for NoopObserver {
    fn on_success(&self, _router: &str) {}

    fn on_failure(&self, _router: &str) {}
}

/// Outcome reported to a [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    Success(String),
    Failure(String),
}

impl RouterEvent {
    pub fn router(&self) -> &str {
        match self {
            RouterEvent::Success(router) | RouterEvent::Failure(router) => router,
        }
    }
}

/// Forwards outcomes, stamped with the time they fired, into a channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<(RouterEvent, Instant)>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(RouterEvent, Instant)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RouterConnectionObserver for ChannelObserver {
    fn on_success(&self, router: &str) {
        let _ = self.tx.send((RouterEvent::Success(router.to_string()), Instant::now()));
    }

    fn on_failure(&self, router: &str) {
        let _ = self.tx.send((RouterEvent::Failure(router.to_string()), Instant::now()));
    }
}
