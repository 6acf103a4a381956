//! Verlock Core - connection contract shared by the trigger manager and drivers
//!
//! This crate provides the small surface every other Verlock crate depends on:
//!
//! - `Connection` - Trait for a live, externally owned database connection
//! - `DatabaseDriver` - Trait for opening connections from a `ConnectionConfig`
//! - Common types like `Value`, `Row`, `QueryResult`, etc.

mod connection;
mod driver;
mod error;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use types::*;
