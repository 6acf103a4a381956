//! A trigger dialect bound to a live connection

use std::collections::BTreeSet;
use std::sync::Arc;

use verlock_core::{Connection, Value};

use crate::{ChangeKind, ColumnDescriptor, TriggerDialect, TriggerError};

/// Runs one dialect's trigger statements against one connection
///
/// Usually obtained from [`DialectSelector::select`](crate::DialectSelector::select).
/// The connection is borrowed; the session never closes it.
pub struct TriggerSession {
    dialect: Arc<dyn TriggerDialect>,
    connection: Arc<dyn Connection>,
}

impl TriggerSession {
    pub fn new(dialect: Arc<dyn TriggerDialect>, connection: Arc<dyn Connection>) -> Self {
        Self {
            dialect,
            connection,
        }
    }

    pub fn dialect(&self) -> &dyn TriggerDialect {
        self.dialect.as_ref()
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Installed trigger names, sorted and de-duplicated
    ///
    /// On engines without a server-side filter this includes triggers not
    /// managed here.
    pub async fn list(&self) -> Result<Vec<String>, TriggerError> {
        let sql = self.dialect.render_list();
        tracing::debug!(sql = %sql, "listing triggers");

        let result = self
            .connection
            .query(&sql, &[])
            .await
            .map_err(|source| TriggerError::Execution {
                statement: sql.clone(),
                source,
            })?;

        let column = self.dialect.name_column();
        let mut names: Vec<String> = result
            .rows
            .iter()
            .filter_map(|row| row.get_by_name(column).and_then(Value::to_text))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// The descriptor's trigger name if it is currently installed
    pub async fn get_trigger(
        &self,
        descriptor: &ColumnDescriptor,
    ) -> Result<Option<String>, TriggerError> {
        let name = descriptor.trigger_name();
        Ok(self.list().await?.into_iter().find(|n| *n == name))
    }

    /// Install the descriptor's trigger unless it is already listed
    pub async fn create(&self, descriptor: &mut ColumnDescriptor) -> Result<ChangeKind, TriggerError> {
        let installed: BTreeSet<String> = self.list().await?.into_iter().collect();
        self.create_with(descriptor, &installed).await
    }

    /// Like [`create`](Self::create), against an already fetched trigger list
    pub async fn create_with(
        &self,
        descriptor: &mut ColumnDescriptor,
        installed: &BTreeSet<String>,
    ) -> Result<ChangeKind, TriggerError> {
        let name = descriptor.trigger_name();
        if installed.contains(&name) {
            tracing::debug!(trigger = %name, "trigger already installed, skipping");
            descriptor.set_exists(true);
            return Ok(ChangeKind::AlreadyInstalled);
        }

        self.execute_all(self.dialect.render_create(descriptor)).await?;
        descriptor.set_exists(true);
        tracing::info!(
            trigger = %name,
            table = %descriptor.table_name(),
            column = %descriptor.version_column(),
            "created version trigger"
        );
        Ok(ChangeKind::Created)
    }

    /// Remove the descriptor's trigger; succeeds when it was never installed
    pub async fn drop(&self, descriptor: &mut ColumnDescriptor) -> Result<(), TriggerError> {
        self.execute_all(self.dialect.render_drop(descriptor)).await?;
        descriptor.set_exists(false);
        tracing::info!(
            trigger = %descriptor.trigger_name(),
            table = %descriptor.table_name(),
            "dropped version trigger"
        );
        Ok(())
    }

    /// Statements `create` would run when the trigger is not installed
    pub fn preview_create(&self, descriptor: &ColumnDescriptor) -> Vec<String> {
        self.dialect.render_create(descriptor)
    }

    /// Statements `drop` would run
    pub fn preview_drop(&self, descriptor: &ColumnDescriptor) -> Vec<String> {
        self.dialect.render_drop(descriptor)
    }

    async fn execute_all(&self, statements: Vec<String>) -> Result<(), TriggerError> {
        for statement in statements {
            tracing::debug!(sql = %statement, "executing trigger statement");
            if let Err(source) = self.connection.execute(&statement, &[]).await {
                return Err(TriggerError::Execution { statement, source });
            }
        }
        Ok(())
    }
}
