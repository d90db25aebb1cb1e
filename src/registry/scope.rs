//! Registration scope.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace a logical name belongs to.
///
/// Containers and servers are independent: the same literal name may be
/// registered under both scopes without aliasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// A deployable unit hosted by one or more backend servers.
    Container,
    /// A backend server itself.
    Server,
}

impl Scope {
    /// Both scopes, in marshalling order.
    pub const ALL: [Scope; 2] = [Scope::Container, Scope::Server];

    /// Stable lowercase label, used in logs, metrics and the wire format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Container => "container",
            Scope::Server => "server",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
