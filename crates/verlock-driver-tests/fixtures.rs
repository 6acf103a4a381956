//! Core test fixtures for parameterized trigger testing.
//!
//! Tests identify their engine with [`TestDriver`] and ask for a connection
//! with [`test_connection`]. SQLite connections are fresh in-memory databases;
//! PostgreSQL and MySQL connections share one container per engine, so every
//! test works on its own uniquely named table.
//!
//! # Usage
//!
//! ```rust,ignore
//! use verlock_driver_tests::fixtures::{test_connection, TestDriver};
//! use rstest::rstest;
//!
//! #[rstest]
//! #[tokio::test]
//! async fn test_something(
//!     #[values(TestDriver::Sqlite, TestDriver::Postgres, TestDriver::Mysql)] driver: TestDriver,
//! ) -> anyhow::Result<()> {
//!     let Some(conn) = test_connection(driver).await? else {
//!         return Ok(());
//!     };
//!     // test code...
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use std::sync::{Arc, Once};
use std::time::Duration;
use verlock_core::{Connection, ConnectionConfig, Value};
use verlock_drivers::DriverRegistry;

use crate::test_containers::{containers_available, mysql_container, postgres_container};

/// Test driver identifier for parameterized testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestDriver {
    /// SQLite, in memory
    Sqlite,
    /// PostgreSQL in a container
    Postgres,
    /// MySQL in a container
    Mysql,
}

impl TestDriver {
    /// Get the driver name as reported by `Connection::driver_name`
    pub fn name(&self) -> &'static str {
        match self {
            TestDriver::Sqlite => "sqlite",
            TestDriver::Postgres => "postgresql",
            TestDriver::Mysql => "mysql",
        }
    }

    /// Whether this driver needs a Docker container
    pub fn needs_container(&self) -> bool {
        !matches!(self, TestDriver::Sqlite)
    }
}

static LOGGING: Once = Once::new();

/// Install a test subscriber once per process (`RUST_LOG` controls the level)
pub fn initialize_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

async fn connection_config(driver: TestDriver) -> Result<ConnectionConfig> {
    let config = match driver {
        TestDriver::Sqlite => ConnectionConfig::new_sqlite(":memory:"),
        TestDriver::Postgres => {
            let info = postgres_container()
                .await
                .context("failed to start PostgreSQL container - is Docker running?")?;
            ConnectionConfig::new("postgresql", "default")
                .with_param("host", info.host)
                .with_param("port", info.port)
                .with_param("database", info.database)
                .with_param("user", info.username)
                .with_param("password", info.password)
        }
        TestDriver::Mysql => {
            let info = mysql_container()
                .await
                .context("failed to start MySQL container - is Docker running?")?;
            let config = ConnectionConfig::new("mysql", "default")
                .with_param("host", info.host)
                .with_param("port", info.port)
                .with_param("database", info.database)
                .with_param("user", info.username);
            if info.password.is_empty() {
                config
            } else {
                config.with_param("password", info.password)
            }
        }
    };
    Ok(config)
}

/// Open a connection for `driver`, or `None` when its container cannot run here
///
/// Servers may still be starting right after their container comes up, so
/// connecting is retried with a growing delay.
pub async fn test_connection(driver: TestDriver) -> Result<Option<Arc<dyn Connection>>> {
    initialize_logging();

    if driver.needs_container() && !containers_available() {
        tracing::warn!(driver = %driver.name(), "no Docker daemon found, skipping");
        return Ok(None);
    }

    let config = connection_config(driver).await?;
    let registry = DriverRegistry::with_defaults();
    let max_attempts = 10;
    let mut attempt = 1;

    loop {
        match registry.connect(&config).await {
            Ok(conn) => return Ok(Some(conn)),
            Err(e) if attempt < max_attempts => {
                let delay = Duration::from_millis(500 * attempt as u64);
                tracing::warn!(
                    driver = %driver.name(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "connection failed, retrying: {}",
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to connect to {} after {} attempts", driver.name(), max_attempts)
                });
            }
        }
    }
}

/// A table name no other test uses
pub fn unique_table(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &suffix[..12])
}

/// Create `table (id, name, version)` with `version` defaulting to 0
pub async fn create_versioned_table(conn: &Arc<dyn Connection>, table: &str) -> Result<()> {
    conn.execute(
        &format!(
            "CREATE TABLE {table} (id INTEGER PRIMARY KEY, name VARCHAR(50), version INTEGER NOT NULL DEFAULT 0)"
        ),
        &[],
    )
    .await
    .with_context(|| format!("failed to create table {}", table))?;
    Ok(())
}

/// Insert a row with the given id and version 0
pub async fn insert_row(conn: &Arc<dyn Connection>, table: &str, id: i64, name: &str) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO {table} (id, name, version) VALUES ({id}, '{name}', 0)"),
        &[],
    )
    .await
    .with_context(|| format!("failed to insert into {}", table))?;
    Ok(())
}

/// Run an UPDATE against `table`
pub async fn update(conn: &Arc<dyn Connection>, table: &str, assignments: &str, id: i64) -> Result<()> {
    conn.execute(&format!("UPDATE {table} SET {assignments} WHERE id = {id}"), &[])
        .await
        .with_context(|| format!("failed to update {}", table))?;
    Ok(())
}

/// Current version of row `id`
pub async fn version_of(conn: &Arc<dyn Connection>, table: &str, id: i64) -> Result<i64> {
    let result = conn
        .query(&format!("SELECT version FROM {table} WHERE id = {id}"), &[])
        .await
        .with_context(|| format!("failed to read version from {}", table))?;
    result
        .rows
        .first()
        .and_then(|row| row.get(0))
        .and_then(Value::as_i64)
        .with_context(|| format!("no version for id {} in {}", id, table))
}

/// Drop `table`, ignoring errors
pub async fn drop_table(conn: &Arc<dyn Connection>, table: &str) {
    if let Err(e) = conn.execute(&format!("DROP TABLE IF EXISTS {table}"), &[]).await {
        tracing::warn!(table = %table, error = %e, "failed to drop test table");
    }
}
