//! Registration request wire types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::registry::Scope;

/// Admin operation carried by a registration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Remove,
}

impl Operation {
    /// Admin path relative to a router base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Operation::Add => "/admin/add",
            Operation::Remove => "/admin/remove",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Remove => "remove",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /admin/add` and `POST /admin/remove`.
///
/// Idempotent: re-sending the same request has no effect beyond the first
/// successful application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub scope: Scope,
    pub name: String,
    pub url: String,
}

impl RegistrationRequest {
    pub fn new(scope: Scope, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn container(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(Scope::Container, name, url)
    }

    pub fn server(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(Scope::Server, name, url)
    }
}
