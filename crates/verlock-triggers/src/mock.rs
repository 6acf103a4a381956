//! Recording connection for unit tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use verlock_core::{Connection, QueryResult, Result, StatementResult, Value, VerlockError};

use crate::DialectKind;

/// Connection that records every statement and answers list queries from a fixed set
pub(crate) struct MockConnection {
    engine: String,
    installed: Vec<String>,
    fail_on: Option<String>,
    executed: Mutex<Vec<String>>,
    queried: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MockConnection {
    pub(crate) fn new(engine: &str) -> Self {
        Self {
            engine: engine.to_string(),
            installed: Vec::new(),
            fail_on: None,
            executed: Mutex::new(Vec::new()),
            queried: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Trigger names reported by list queries
    pub(crate) fn with_installed(mut self, names: &[&str]) -> Self {
        self.installed = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Fail any statement containing `fragment`
    pub(crate) fn failing_on(mut self, fragment: &str) -> Self {
        self.fail_on = Some(fragment.to_string());
        self
    }

    pub(crate) fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Executed statements, in order
    pub(crate) fn statements(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    /// Issued queries, in order
    pub(crate) fn queries(&self) -> Vec<String> {
        self.queried.lock().clone()
    }

    fn check(&self, sql: &str) -> Result<()> {
        match &self.fail_on {
            Some(fragment) if sql.contains(fragment.as_str()) => {
                Err(VerlockError::Query(format!("rejected: {}", fragment)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        &self.engine
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<StatementResult> {
        self.executed.lock().push(sql.to_string());
        self.check(sql)?;
        Ok(StatementResult::new(0))
    }

    async fn query(&self, sql: &str, _params: &[Value]) -> Result<QueryResult> {
        self.queried.lock().push(sql.to_string());
        self.check(sql)?;
        let column = DialectKind::from_engine(&self.engine)
            .map(|kind| kind.strategy().name_column())
            .unwrap_or("name");
        Ok(QueryResult::from_rows(
            vec![column.to_string()],
            self.installed
                .iter()
                .map(|name| vec![Value::String(name.clone())])
                .collect(),
        ))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
