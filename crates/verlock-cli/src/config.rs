//! TOML manifest describing connections, write routing and version columns

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use verlock_core::ConnectionConfig;
use verlock_triggers::{ColumnDescriptor, StaticRouter, TriggerRegistry, WriteRouter, DEFAULT_ALIAS};

/// File looked up in the working directory when no path is given
pub const DEFAULT_MANIFEST: &str = "verlock.toml";

fn default_alias() -> String {
    DEFAULT_ALIAS.to_string()
}

/// Parsed `verlock.toml`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub connections: BTreeMap<String, ConnectionEntry>,
    #[serde(default)]
    pub routing: Routing,
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
}

/// One `[connections.<alias>]` table
#[derive(Debug, Deserialize)]
pub struct ConnectionEntry {
    pub driver: String,
    /// Everything else is handed to the driver as a string parameter
    #[serde(flatten)]
    pub params: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Routing {
    #[serde(default = "default_alias")]
    pub default: String,
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
}

impl Default for Routing {
    fn default() -> Self {
        Self {
            default: default_alias(),
            entities: BTreeMap::new(),
        }
    }
}

impl Manifest {
    /// Read and validate the manifest at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest {:?}", path))
    }

    /// Parse and validate manifest text
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(content).context("Failed to parse manifest TOML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.connections.is_empty() {
            bail!("no connections configured");
        }
        for (alias, entry) in &self.connections {
            if entry.driver.trim().is_empty() {
                bail!("connection '{}' has an empty driver", alias);
            }
        }
        for (entity, alias) in &self.routing.entities {
            if !self.connections.contains_key(alias) {
                bail!("entity '{}' is routed to unknown connection '{}'", entity, alias);
            }
        }

        let router = self.router();
        for column in &self.columns {
            let fields = [
                ("entity", column.entity()),
                ("table", column.table_name()),
                ("version_column", column.version_column()),
                ("primary_key", column.primary_key_column()),
                ("trigger_name", column.explicit_name().unwrap_or("-")),
            ];
            if let Some((field, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
                bail!("column on table '{}' has an empty {}", column.table_name(), field);
            }
            let alias = router.db_for_write(column.entity());
            if !self.connections.contains_key(&alias) {
                bail!(
                    "column {}.{} (entity '{}') is routed to unknown connection '{}'",
                    column.table_name(),
                    column.version_column(),
                    column.entity(),
                    alias
                );
            }
        }
        Ok(())
    }

    /// Write router built from `[routing]`
    pub fn router(&self) -> StaticRouter {
        self.routing
            .entities
            .iter()
            .fold(StaticRouter::new(self.routing.default.clone()), |router, (entity, alias)| {
                router.with_route(entity.clone(), alias.clone())
            })
    }

    /// Registry holding every `[[columns]]` entry
    pub fn registry(&self) -> TriggerRegistry {
        self.columns.iter().cloned().collect()
    }

    /// Driver configuration for `alias`
    pub fn connection_config(&self, alias: &str) -> Result<ConnectionConfig> {
        let entry = self
            .connections
            .get(alias)
            .with_context(|| format!("unknown connection alias '{}'", alias))?;

        let mut config = ConnectionConfig::new(&entry.driver, alias);
        for (key, value) in &entry.params {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => bail!(
                    "connection '{}': parameter '{}' must be a string, integer or boolean, got {}",
                    alias,
                    key,
                    other.type_str()
                ),
            };
            config.params.insert(key.clone(), text);
        }
        Ok(config)
    }

    /// Every configured alias, sorted
    pub fn aliases(&self) -> Vec<&str> {
        self.connections.keys().map(|s| s.as_str()).collect()
    }
}

/// Pick the manifest path
///
/// An explicit path always wins. Otherwise `verlock.toml` in the working
/// directory, then `<config dir>/verlock/verlock.toml`.
pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    let local = PathBuf::from(DEFAULT_MANIFEST);
    if local.exists() {
        return local;
    }
    match dirs::config_dir().map(|dir| dir.join("verlock").join(DEFAULT_MANIFEST)) {
        Some(user) if user.exists() => user,
        _ => local,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const MANIFEST: &str = indoc! {r#"
        [connections.default]
        driver = "sqlite"
        path = "app.db"

        [connections.orders]
        driver = "postgresql"
        host = "localhost"
        port = 5432
        database = "orders"
        user = "app"

        [routing.entities]
        Order = "orders"

        [[columns]]
        entity = "Order"
        table = "orders"
        version_column = "version"

        [[columns]]
        entity = "Customer"
        table = "customers"
        version_column = "revision"
        primary_key = "customer_id"
        trigger_name = "customers_rev"
    "#};

    #[test]
    fn test_parse_full_manifest() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.aliases(), vec!["default", "orders"]);
        assert_eq!(manifest.routing.default, "default");

        let router = manifest.router();
        assert_eq!(router.db_for_write("Order"), "orders");
        assert_eq!(router.db_for_write("Customer"), "default");

        let registry = manifest.registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.all()[0].trigger_name(), "concurrency_orders_version");
        assert_eq!(registry.all()[1].trigger_name(), "customers_rev");
        assert_eq!(registry.all()[1].primary_key_column(), "customer_id");
    }

    #[test]
    fn test_connection_params_become_strings() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let config = manifest.connection_config("orders").unwrap();
        assert_eq!(config.driver, "postgresql");
        assert_eq!(config.name, "orders");
        assert_eq!(config.get_port(0).unwrap(), 5432);
        assert_eq!(config.get_string("user").as_deref(), Some("app"));
        assert!(!config.params.contains_key("driver"));

        assert!(manifest.connection_config("replica").is_err());
    }

    #[test]
    fn test_rejects_nested_param() {
        let manifest = Manifest::parse(indoc! {r#"
            [connections.default]
            driver = "mysql"
            hosts = ["a", "b"]
        "#})
        .unwrap();
        let err = manifest.connection_config("default").unwrap_err();
        assert!(err.to_string().contains("'hosts'"), "{}", err);
    }

    #[test]
    fn test_requires_a_connection() {
        let err = Manifest::parse("[connections]\n").unwrap_err();
        assert!(format!("{:#}", err).contains("no connections configured"));
    }

    #[test]
    fn test_rejects_route_to_unknown_alias() {
        let err = Manifest::parse(indoc! {r#"
            [connections.default]
            driver = "sqlite"
            path = ":memory:"

            [routing.entities]
            Order = "orders"
        "#})
        .unwrap_err();
        assert!(format!("{:#}", err).contains("unknown connection 'orders'"));
    }

    #[test]
    fn test_rejects_column_falling_back_to_missing_default() {
        let err = Manifest::parse(indoc! {r#"
            [connections.primary]
            driver = "sqlite"
            path = ":memory:"

            [[columns]]
            entity = "Order"
            table = "orders"
            version_column = "version"
        "#})
        .unwrap_err();
        assert!(format!("{:#}", err).contains("routed to unknown connection 'default'"));
    }

    #[test]
    fn test_rejects_empty_column_name() {
        let err = Manifest::parse(indoc! {r#"
            [connections.default]
            driver = "sqlite"

            [[columns]]
            entity = "Order"
            table = "orders"
            version_column = ""
        "#})
        .unwrap_err();
        assert!(format!("{:#}", err).contains("empty version_column"));
    }

    #[test]
    fn test_rejects_unknown_top_level_key() {
        let err = Manifest::parse(indoc! {r#"
            [connections.default]
            driver = "sqlite"

            [colums]
        "#})
        .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse manifest TOML"));
    }

    #[test]
    fn test_rejects_misspelled_column_key() {
        let err = Manifest::parse(indoc! {r#"
            [connections.default]
            driver = "sqlite"

            [[columns]]
            entity = "Order"
            table = "orders"
            version_column = "version"
            primary_keys = "order_id"
        "#})
        .unwrap_err();
        assert!(format!("{:#}", err).contains("primary_keys"), "{:#}", err);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();

        let manifest = Manifest::load(file.path()).unwrap();
        assert_eq!(manifest.columns.len(), 2);

        let missing = file.path().with_extension("missing");
        let err = Manifest::load(&missing).unwrap_err();
        assert!(err.to_string().contains("Failed to read manifest"));
    }

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        assert_eq!(resolve_path(Some(path.clone())), path);
    }
}
