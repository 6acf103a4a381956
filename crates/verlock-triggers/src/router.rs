//! Write routing
//!
//! Triggers have to live on whichever connection receives writes for their
//! table, which is not necessarily the same one for every entity.

use std::collections::HashMap;

/// Alias used when nothing routes an entity elsewhere
pub const DEFAULT_ALIAS: &str = "default";

/// Decides which connection alias receives writes for an entity
pub trait WriteRouter: Send + Sync {
    fn db_for_write(&self, entity: &str) -> String;
}

impl<F> WriteRouter for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn db_for_write(&self, entity: &str) -> String {
        self(entity)
    }
}

/// Routes every entity to [`DEFAULT_ALIAS`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRouter;

impl WriteRouter for DefaultRouter {
    fn db_for_write(&self, _entity: &str) -> String {
        DEFAULT_ALIAS.to_string()
    }
}

/// Fixed entity → alias table with a fallback alias
///
/// # Examples
///
/// ```
/// use verlock_triggers::{StaticRouter, WriteRouter};
///
/// let router = StaticRouter::new("default").with_route("Order", "orders");
/// assert_eq!(router.db_for_write("Order"), "orders");
/// assert_eq!(router.db_for_write("Customer"), "default");
/// ```
#[derive(Debug, Clone)]
pub struct StaticRouter {
    routes: HashMap<String, String>,
    fallback: String,
}

impl StaticRouter {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            routes: HashMap::new(),
            fallback: fallback.into(),
        }
    }

    /// Send writes for `entity` to `alias`
    pub fn with_route(mut self, entity: impl Into<String>, alias: impl Into<String>) -> Self {
        self.add_route(entity, alias);
        self
    }

    pub fn add_route(&mut self, entity: impl Into<String>, alias: impl Into<String>) {
        self.routes.insert(entity.into(), alias.into());
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Every alias this router can return
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.fallback.as_str()).chain(self.routes.values().map(|s| s.as_str()))
    }
}

impl Default for StaticRouter {
    fn default() -> Self {
        Self::new(DEFAULT_ALIAS)
    }
}

impl WriteRouter for StaticRouter {
    fn db_for_write(&self, entity: &str) -> String {
        self.routes
            .get(entity)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
