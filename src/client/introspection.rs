//! View of the hosting server's deployable units.

/// Identity of a deployable unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerDescriptor {
    pub id: String,
    /// Alternative routing name; announced alongside the id.
    pub alias: Option<String>,
}

impl ContainerDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Every name this unit is routed under, id first, without duplicates.
    pub fn names(&self) -> Vec<&str> {
        let mut names = vec![self.id.as_str()];
        if let Some(alias) = self.alias.as_deref() {
            if !alias.is_empty() && alias != self.id {
                names.push(alias);
            }
        }
        names
    }
}

/// Supplied by the backend server so the client can enumerate what to
/// unregister when the server stops.
pub trait ServerIntrospection: Send + Sync {
    /// Units currently started on this server.
    fn active_containers(&self) -> Vec<ContainerDescriptor>;
}

impl ServerIntrospection for Vec<ContainerDescriptor> {
    fn active_containers(&self) -> Vec<ContainerDescriptor> {
        self.clone()
    }
}
