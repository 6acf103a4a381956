//! Verlock Drivers - Database driver implementations
//!
//! This crate bundles the concrete drivers behind the traits defined in
//! `verlock-core` and exposes a registry to look them up by name.

#[cfg(feature = "mysql")]
pub use verlock_driver_mysql as mysql;
#[cfg(feature = "postgres")]
pub use verlock_driver_postgres as postgres;
#[cfg(feature = "sqlite")]
pub use verlock_driver_sqlite as sqlite;

mod registry;

pub use registry::DriverRegistry;

/// Re-export commonly used types from verlock-core
pub use verlock_core::{
    Connection, ConnectionConfig, DatabaseDriver, QueryResult, Result, Row, StatementResult,
    Value, VerlockError,
};
