//! Database driver trait definition

use crate::{Connection, Result, VerlockError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Core driver trait that all database drivers must implement
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "postgresql", "mysql", "sqlite")
    fn name(&self) -> &'static str;

    /// Display name for output
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Default connection port (None for file-based databases like SQLite)
    fn default_port(&self) -> Option<u16> {
        None
    }

    /// Create a new connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Open a connection and run a trivial query against it
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        let conn = self.connect(config).await?;
        conn.query("SELECT 1", &[]).await?;
        Ok(())
    }
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Connection alias
    pub name: String,
    /// Driver ID (e.g., "postgresql", "mysql", "sqlite")
    pub driver: String,
    /// Connection parameters (host, port, database, path, user, password, ...)
    pub params: HashMap<String, String>,
}

impl ConnectionConfig {
    /// Create a new configuration with no parameters
    pub fn new(driver: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            driver: driver.to_string(),
            params: HashMap::new(),
        }
    }

    /// Create a SQLite configuration
    pub fn new_sqlite(database_path: &str) -> Self {
        Self::new("sqlite", "default").with_param("path", database_path)
    }

    /// Set a connection parameter
    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        let str_val = match value.into() {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        self.params.insert(key.to_string(), str_val);
        self
    }

    /// Get a string parameter
    pub fn get_string(&self, key: &str) -> Option<String> {
        if let Some(val) = self.params.get(key) {
            return Some(val.clone());
        }
        // Aliases accepted for the common keys
        let alias = match key {
            "user" => "username",
            "username" => "user",
            "path" => "database",
            _ => return None,
        };
        self.params.get(alias).cloned()
    }

    /// Get the port, falling back to `default` when unset
    pub fn get_port(&self, default: u16) -> Result<u16> {
        match self.params.get("port") {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                VerlockError::Configuration(format!(
                    "Invalid port '{}' for connection '{}'",
                    raw, self.name
                ))
            }),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_aliases() {
        let config = ConnectionConfig::new("postgresql", "orders")
            .with_param("username", "app")
            .with_param("database", "orders_db");
        assert_eq!(config.get_string("user").as_deref(), Some("app"));
        assert_eq!(config.get_string("path").as_deref(), Some("orders_db"));
        assert_eq!(config.get_string("password"), None);
    }

    #[test]
    fn test_port_parsing() {
        let config = ConnectionConfig::new("mysql", "m").with_param("port", 3307);
        assert_eq!(config.get_port(3306).unwrap(), 3307);

        let config = ConnectionConfig::new("mysql", "m");
        assert_eq!(config.get_port(3306).unwrap(), 3306);

        let config = ConnectionConfig::new("mysql", "m").with_param("port", "abc");
        assert!(matches!(
            config.get_port(3306),
            Err(VerlockError::Configuration(_))
        ));
    }
}
