//! Named connections the manager may target

use std::collections::BTreeMap;
use std::sync::Arc;

use verlock_core::Connection;

/// Connections keyed by alias, iterated in alias order
#[derive(Clone, Default)]
pub struct ConnectionSet {
    connections: BTreeMap<String, Arc<dyn Connection>>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection, returning `self` for chaining
    pub fn with(mut self, alias: impl Into<String>, connection: Arc<dyn Connection>) -> Self {
        self.insert(alias, connection);
        self
    }

    /// Add a connection, returning the one previously stored under `alias`
    pub fn insert(
        &mut self,
        alias: impl Into<String>,
        connection: Arc<dyn Connection>,
    ) -> Option<Arc<dyn Connection>> {
        self.connections.insert(alias.into(), connection)
    }

    pub fn get(&self, alias: &str) -> Option<&Arc<dyn Connection>> {
        self.connections.get(alias)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.connections.contains_key(alias)
    }

    /// Every alias, sorted
    pub fn aliases(&self) -> Vec<&str> {
        self.connections.keys().map(|s| s.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Connection>)> {
        self.connections.iter().map(|(alias, conn)| (alias.as_str(), conn))
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl std::fmt::Debug for ConnectionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(alias, conn)| (alias, conn.driver_name())))
            .finish()
    }
}
