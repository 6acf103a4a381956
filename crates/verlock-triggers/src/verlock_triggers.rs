//! Verlock Triggers - database-maintained version counters
//!
//! Installs, lists and removes row-level triggers that bump an integer
//! version column on every UPDATE, so optimistic-concurrency checks keep
//! working when rows are changed by raw SQL or bulk updates.
//!
//! - `ColumnDescriptor` / `TriggerRegistry` - which columns need a trigger
//! - `TriggerDialect` / `DialectSelector` - per-engine DDL (SQLite, PostgreSQL, MySQL)
//! - `TriggerSession` - a dialect bound to one connection
//! - `TriggerManager` - runs list/create/drop across routed connections
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use verlock_triggers::{ColumnDescriptor, ConnectionSet, TriggerManager, TriggerRegistry};
//!
//! # async fn run(conn: Arc<dyn verlock_core::Connection>) -> Result<(), verlock_triggers::TriggerError> {
//! let mut registry = TriggerRegistry::new();
//! registry.register(ColumnDescriptor::new("Order", "orders", "version"));
//!
//! let connections = ConnectionSet::new().with("default", conn);
//! let manager = TriggerManager::new(&connections);
//! let created = manager.create_triggers(&mut registry, None).await.into_result()?;
//! assert_eq!(created["default"].len(), 1);
//! # Ok(())
//! # }
//! ```

mod connections;
mod descriptor;
pub mod dialect;
mod error;
mod manager;
mod naming;
mod registry;
mod report;
mod router;
mod selector;
mod session;

#[cfg(test)]
mod mock;

pub use connections::ConnectionSet;
pub use descriptor::ColumnDescriptor;
pub use dialect::{DialectKind, MySqlTriggers, PostgresTriggers, SqliteTriggers, TriggerDialect};
pub use error::TriggerError;
pub use manager::TriggerManager;
pub use naming::{TRIGGER_PREFIX, derive_name};
pub use registry::TriggerRegistry;
pub use report::{AliasReport, ChangeKind, TriggerChange, TriggerListing, TriggerReport};
pub use router::{DEFAULT_ALIAS, DefaultRouter, StaticRouter, WriteRouter};
pub use selector::DialectSelector;
pub use session::TriggerSession;
