//! Dialect selection by engine identifier

use std::collections::HashMap;
use std::sync::Arc;

use verlock_core::Connection;

use crate::{DialectKind, TriggerDialect, TriggerError, TriggerSession};

/// Maps engine identifiers to trigger dialects
///
/// New engines are supported by implementing [`TriggerDialect`] and
/// registering it here under the identifier their connections report.
pub struct DialectSelector {
    dialects: HashMap<String, Arc<dyn TriggerDialect>>,
}

impl DialectSelector {
    /// Create a selector with no dialects
    pub fn new() -> Self {
        Self {
            dialects: HashMap::new(),
        }
    }

    /// Create a selector with the SQLite, PostgreSQL and MySQL dialects
    pub fn with_defaults() -> Self {
        let mut selector = Self::new();
        for kind in DialectKind::ALL {
            let dialect = kind.strategy();
            for engine in kind.engine_aliases() {
                selector.register(engine, Arc::clone(&dialect));
            }
        }
        selector
    }

    /// Register `dialect` for an engine identifier (case-insensitive)
    pub fn register(&mut self, engine: &str, dialect: Arc<dyn TriggerDialect>) {
        tracing::debug!(engine = %engine, dialect = %dialect.kind(), "registering trigger dialect");
        self.dialects.insert(engine.to_ascii_lowercase(), dialect);
    }

    /// Check if an engine identifier has a dialect
    pub fn supports(&self, engine: &str) -> bool {
        self.dialects.contains_key(&engine.to_ascii_lowercase())
    }

    /// Registered engine identifiers, sorted
    pub fn engines(&self) -> Vec<&str> {
        let mut engines: Vec<&str> = self.dialects.keys().map(|s| s.as_str()).collect();
        engines.sort_unstable();
        engines
    }

    /// The dialect registered for an engine identifier
    pub fn dialect_for(&self, engine: &str) -> Result<Arc<dyn TriggerDialect>, TriggerError> {
        self.dialects
            .get(&engine.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| TriggerError::UnsupportedEngine {
                engine: engine.to_string(),
            })
    }

    /// Bind the dialect matching `connection`'s engine to it
    pub fn select(&self, connection: Arc<dyn Connection>) -> Result<TriggerSession, TriggerError> {
        let dialect = self.dialect_for(connection.driver_name())?;
        Ok(TriggerSession::new(dialect, connection))
    }
}

impl Default for DialectSelector {
    fn default() -> Self {
        Self::with_defaults()
    }
}
