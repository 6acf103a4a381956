//! Verlock cross-engine trigger tests
//!
//! Runs the same trigger scenarios against SQLite, PostgreSQL and MySQL using
//! rstest parameterisation. SQLite runs in memory; PostgreSQL and MySQL run in
//! Docker containers started on demand by testcontainers-rs.
//!
//! # Usage
//!
//! ```bash
//! # Everything (containers start automatically)
//! cargo test -p verlock-driver-tests
//!
//! # Only the in-memory SQLite cases
//! VERLOCK_TEST_SKIP_CONTAINERS=1 cargo test -p verlock-driver-tests
//!
//! # Against servers you manage yourself
//! export VERLOCK_TEST_MANUAL_CONTAINERS=1
//! export VERLOCK_TEST_POSTGRES_PORT=5433 VERLOCK_TEST_MYSQL_PORT=3307
//! cargo test -p verlock-driver-tests
//! ```
//!
//! Container-backed cases are skipped with a warning when no Docker daemon
//! can be found.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fixtures;
pub mod test_containers;

#[cfg(test)]
mod trigger_tests;
