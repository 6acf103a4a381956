//! Command implementations
//!
//! Each command renders a table and collects per-connection failures instead
//! of stopping at the first one; the caller decides the exit status.

use anyhow::{bail, Result};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use std::collections::BTreeMap;
use verlock_drivers::DriverRegistry;
use verlock_triggers::{
    AliasReport, ConnectionSet, DialectSelector, TriggerManager, TriggerReport, WriteRouter,
};

use crate::config::Manifest;

/// What a command prints
pub struct CommandOutput {
    pub table: Table,
    /// Failure message per connection alias
    pub failures: BTreeMap<String, String>,
}

impl CommandOutput {
    fn new(header: Vec<&str>) -> Self {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(header);
        Self {
            table,
            failures: BTreeMap::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb<T>(&mut self, report: AliasReport<T>) -> BTreeMap<String, T> {
        let (results, failures) = report.into_parts();
        self.failures
            .extend(failures.into_iter().map(|(alias, e)| (alias, e.to_string())));
        results
    }
}

/// Aliases to work on: the requested ones in order, or every configured alias
fn targets(manifest: &Manifest, requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(manifest.aliases().into_iter().map(String::from).collect());
    }
    let mut targets: Vec<String> = Vec::with_capacity(requested.len());
    for alias in requested {
        if !manifest.connections.contains_key(alias) {
            bail!(
                "unknown connection alias '{}' (configured: {})",
                alias,
                manifest.aliases().join(", ")
            );
        }
        if !targets.contains(alias) {
            targets.push(alias.clone());
        }
    }
    Ok(targets)
}

/// Connect every target; aliases that fail to connect land in `output.failures`
async fn connect(
    manifest: &Manifest,
    targets: &[String],
    output: &mut CommandOutput,
) -> Result<ConnectionSet> {
    let drivers = DriverRegistry::with_defaults();
    let mut connections = ConnectionSet::new();

    for alias in targets {
        let config = manifest.connection_config(alias)?;
        match drivers.connect(&config).await {
            Ok(connection) => {
                tracing::debug!(alias = %alias, driver = %config.driver, "connected");
                connections.insert(alias.clone(), connection);
            }
            Err(e) => {
                tracing::error!(alias = %alias, error = %e, "failed to connect");
                output.failures.insert(alias.clone(), e.to_string());
            }
        }
    }
    Ok(connections)
}

async fn disconnect(connections: &ConnectionSet) {
    for (alias, connection) in connections.iter() {
        if let Err(e) = connection.close().await {
            tracing::warn!(alias = %alias, error = %e, "failed to close connection");
        }
    }
}

/// Installed triggers per connection
pub async fn list_triggers(manifest: &Manifest, requested: &[String]) -> Result<CommandOutput> {
    let targets = targets(manifest, requested)?;
    let mut output = CommandOutput::new(vec!["Connection", "Trigger"]);
    let connections = connect(manifest, &targets, &mut output).await?;

    let aliases = connections.aliases();
    let report = TriggerManager::new(&connections)
        .list_triggers(Some(aliases.as_slice()))
        .await;
    for (alias, names) in output.absorb(report) {
        for name in names {
            output.table.add_row(vec![alias.clone(), name]);
        }
    }

    disconnect(&connections).await;
    Ok(output)
}

/// Install triggers for every configured column routed to the targets
pub async fn create_triggers(manifest: &Manifest, requested: &[String]) -> Result<CommandOutput> {
    apply(manifest, requested, false).await
}

/// Remove triggers for every configured column routed to the targets
pub async fn drop_triggers(manifest: &Manifest, requested: &[String]) -> Result<CommandOutput> {
    apply(manifest, requested, true).await
}

async fn apply(manifest: &Manifest, requested: &[String], drop: bool) -> Result<CommandOutput> {
    let targets = targets(manifest, requested)?;
    let mut output = CommandOutput::new(vec!["Connection", "Entity", "Trigger", "Result"]);
    let connections = connect(manifest, &targets, &mut output).await?;

    let mut registry = manifest.registry();
    let manager = TriggerManager::new(&connections).with_router(manifest.router());
    let aliases = connections.aliases();
    let report: TriggerReport = if drop {
        manager.drop_triggers(&mut registry, Some(aliases.as_slice())).await
    } else {
        manager.create_triggers(&mut registry, Some(aliases.as_slice())).await
    };

    for (alias, changes) in output.absorb(report) {
        for change in changes {
            output.table.add_row(vec![
                alias.clone(),
                change.entity,
                change.trigger_name,
                change.kind.to_string(),
            ]);
        }
    }

    disconnect(&connections).await;
    Ok(output)
}

/// DDL that create (or drop) would run, rendered from the configured driver
///
/// Nothing is connected to, so the live trigger list is not consulted.
pub fn render_sql(manifest: &Manifest, requested: &[String], drop: bool) -> Result<CommandOutput> {
    let targets = targets(manifest, requested)?;
    let mut output = CommandOutput::new(vec!["Connection", "Trigger", "Statement"]);
    let selector = DialectSelector::with_defaults();
    let router = manifest.router();

    for alias in &targets {
        let columns: Vec<_> = manifest
            .columns
            .iter()
            .filter(|c| router.db_for_write(c.entity()) == *alias)
            .collect();
        if columns.is_empty() {
            continue;
        }
        let driver = &manifest.connections[alias].driver;
        let dialect = match selector.dialect_for(driver) {
            Ok(dialect) => dialect,
            Err(e) => {
                output.failures.insert(alias.clone(), e.to_string());
                continue;
            }
        };
        for column in columns {
            let statements = if drop {
                dialect.render_drop(column)
            } else {
                dialect.render_create(column)
            };
            for statement in statements {
                output
                    .table
                    .add_row(vec![alias.clone(), column.trigger_name(), format!("{statement};")]);
            }
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::{formatdoc, indoc};

    fn manifest() -> Manifest {
        let base = indoc! {r#"
            [connections.default]
            driver = "sqlite"
            path = ":memory:"

            [connections.orders]
            driver = "postgres"
            database = "orders"

            [routing.entities]
            Order = "orders"

            [[columns]]
            entity = "Order"
            table = "orders"
            version_column = "version"

            [[columns]]
            entity = "Customer"
            table = "customers"
            version_column = "version"
        "#};
        Manifest::parse(base).unwrap()
    }

    fn rows(output: &CommandOutput) -> Vec<Vec<String>> {
        output
            .table
            .row_iter()
            .map(|row| row.cell_iter().map(|cell| cell.content()).collect())
            .collect()
    }

    fn column(output: &CommandOutput, index: usize) -> Vec<String> {
        rows(output).into_iter().map(|mut row| row.remove(index)).collect()
    }

    #[test]
    fn test_targets_default_to_every_alias() {
        let manifest = manifest();
        assert_eq!(targets(&manifest, &[]).unwrap(), vec!["default", "orders"]);
        assert_eq!(
            targets(&manifest, &["orders".into(), "orders".into()]).unwrap(),
            vec!["orders"]
        );
        let err = targets(&manifest, &["replica".into()]).unwrap_err();
        assert!(err.to_string().contains("unknown connection alias 'replica'"));
    }

    #[test]
    fn test_sql_renders_per_routed_connection() {
        let manifest = manifest();
        let output = render_sql(&manifest, &["orders".into()], false).unwrap();
        assert!(output.is_success());
        // function, drop trigger, create trigger
        let rows = rows(&output);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row[0] == "orders" && row[1] == "concurrency_orders_version"));
        assert!(rows[0][2].starts_with("CREATE OR REPLACE FUNCTION func_concurrency_orders_version()"));
        assert!(rows[2][2].ends_with(";"));
    }

    #[test]
    fn test_sql_drop_for_sqlite() {
        let manifest = manifest();
        let output = render_sql(&manifest, &["default".into()], true).unwrap();
        assert_eq!(
            rows(&output),
            vec![vec![
                "default".to_string(),
                "concurrency_customers_version".to_string(),
                "DROP TRIGGER IF EXISTS concurrency_customers_version;".to_string(),
            ]]
        );
    }

    #[test]
    fn test_sql_reports_unsupported_driver() {
        let manifest = Manifest::parse(indoc! {r#"
            [connections.default]
            driver = "oracle"

            [[columns]]
            entity = "Order"
            table = "orders"
            version_column = "version"
        "#})
        .unwrap();
        let output = render_sql(&manifest, &[], false).unwrap();
        assert!(!output.is_success());
        assert!(output.failures["default"].contains("oracle"));
    }

    #[tokio::test]
    async fn test_create_reports_connect_failure_per_alias() {
        let manifest = Manifest::parse(indoc! {r#"
            [connections.default]
            driver = "sqlite"
            path = ":memory:"

            [connections.broken]
            driver = "postgresql"
            host = "localhost"
            port = "not-a-port"
            database = "orders"
        "#})
        .unwrap();

        let output = create_triggers(&manifest, &[]).await.unwrap();
        assert_eq!(output.failures.len(), 1);
        assert!(output.failures["broken"].contains("Invalid port"));
        assert!(rows(&output).is_empty());
    }

    #[tokio::test]
    async fn test_create_then_list_on_sqlite_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("app.db");
        let manifest = Manifest::parse(&formatdoc! {r#"
                [connections.default]
                driver = "sqlite"
                path = "{}"

                [[columns]]
                entity = "Customer"
                table = "customers"
                version_column = "version"
            "#,
            db.display()
        })
        .unwrap();

        let config = manifest.connection_config("default").unwrap();
        let setup = DriverRegistry::with_defaults().connect(&config).await.unwrap();
        setup
            .execute(
                "CREATE TABLE customers (id INTEGER PRIMARY KEY, version INTEGER NOT NULL DEFAULT 0)",
                &[],
            )
            .await
            .unwrap();
        setup.close().await.unwrap();

        let created = create_triggers(&manifest, &[]).await.unwrap();
        assert!(created.is_success(), "{:?}", created.failures);
        assert_eq!(
            rows(&created),
            vec![vec![
                "default".to_string(),
                "Customer".to_string(),
                "concurrency_customers_version".to_string(),
                "created".to_string(),
            ]]
        );

        let again = create_triggers(&manifest, &[]).await.unwrap();
        assert_eq!(column(&again, 3), vec!["already installed"]);

        let listed = list_triggers(&manifest, &[]).await.unwrap();
        assert_eq!(column(&listed, 1), vec!["concurrency_customers_version"]);

        let dropped = drop_triggers(&manifest, &[]).await.unwrap();
        assert_eq!(column(&dropped, 3), vec!["dropped"]);
        let listed = list_triggers(&manifest, &[]).await.unwrap();
        assert!(rows(&listed).is_empty());
    }
}
