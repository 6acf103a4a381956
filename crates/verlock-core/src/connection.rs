//! Connection trait

use crate::{QueryResult, Result, StatementResult, Value};
use async_trait::async_trait;

/// A database connection
///
/// Connections are owned by whoever opened them. Everything above the driver
/// layer only borrows them (usually as `Arc<dyn Connection>`) and never opens,
/// pools or closes them on its own.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "sqlite", "postgresql", "mysql")
    ///
    /// This is the engine-family identifier used to pick SQL dialects.
    fn driver_name(&self) -> &str;

    /// Execute a statement that does not return rows (DDL, INSERT/UPDATE/DELETE)
    ///
    /// When `params` is empty drivers must send the SQL text as-is, so that
    /// statements which cannot be prepared (trigger bodies, function
    /// definitions) still go through.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows (SELECT, SHOW, ...)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}
