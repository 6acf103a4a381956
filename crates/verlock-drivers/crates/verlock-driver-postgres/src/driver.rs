//! PostgreSQL driver implementation

use async_trait::async_trait;
use std::sync::Arc;
use verlock_core::{Connection, ConnectionConfig, DatabaseDriver, Result, VerlockError};

use crate::PostgresConnection;

/// PostgreSQL database driver
pub struct PostgresDriver;

impl PostgresDriver {
    /// Create a new PostgreSQL driver instance
    pub fn new() -> Self {
        tracing::debug!("PostgreSQL driver initialized");
        Self
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn display_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn default_port(&self) -> Option<u16> {
        Some(5432)
    }

    #[tracing::instrument(skip(self, config), fields(connection = %config.name))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let host = config
            .get_string("host")
            .unwrap_or_else(|| "localhost".to_string());
        let port = config.get_port(5432)?;
        let database = config.get_string("database").ok_or_else(|| {
            VerlockError::Configuration(format!(
                "PostgreSQL connection '{}' requires a 'database' parameter",
                config.name
            ))
        })?;
        let user = config.get_string("user");
        let password = config.get_string("password");

        let conn = PostgresConnection::connect(
            &host,
            port,
            &database,
            user.as_deref(),
            password.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to connect to PostgreSQL database");
            e
        })?;

        Ok(Arc::new(conn))
    }
}
