//! Change notifications for the live configuration.

/// Observer of [`Configuration`](crate::registry::Configuration) changes.
///
/// Callbacks run on the mutating thread after the new state has been
/// published, so a listener that reads the configuration sees the change.
/// Only actual changes are reported; idempotent no-op mutations are silent.
pub trait ConfigurationListener: Send + Sync {
    fn on_container_added(&self, _container: &str, _url: &str) {}

    fn on_container_removed(&self, _container: &str, _url: &str) {}

    fn on_server_added(&self, _server: &str, _url: &str) {}

    fn on_server_removed(&self, _server: &str, _url: &str) {}

    /// Fired once after `reload_from` has applied all differences.
    fn on_configuration_reloaded(&self) {}
}
