//! SQLite driver implementation

use async_trait::async_trait;
use std::sync::Arc;
use verlock_core::{Connection, ConnectionConfig, DatabaseDriver, Result, VerlockError};

use crate::SqliteConnection;

/// SQLite database driver
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn display_name(&self) -> &'static str {
        "SQLite"
    }

    #[tracing::instrument(skip(self, config), fields(connection = %config.name))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let path = config.get_string("path").ok_or_else(|| {
            VerlockError::Configuration(
                "SQLite requires 'path' or 'database' parameter. Example: path = \"/path/to/database.db\"".into(),
            )
        })?;

        let conn = SqliteConnection::open(&path).map_err(|e| {
            tracing::error!(error = %e, "failed to connect to SQLite database");
            e
        })?;

        tracing::info!(path = %path, "SQLite connection created");
        Ok(Arc::new(conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_requires_path() {
        let driver = SqliteDriver::new();
        let config = ConnectionConfig::new("sqlite", "default");
        let result = driver.connect(&config).await;
        assert!(matches!(result, Err(VerlockError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_connect_in_memory() {
        let driver = SqliteDriver::new();
        let config = ConnectionConfig::new_sqlite(":memory:");
        let conn = driver.connect(&config).await.unwrap();
        assert_eq!(conn.driver_name(), "sqlite");
        driver.test_connection(&config).await.unwrap();
    }
}
