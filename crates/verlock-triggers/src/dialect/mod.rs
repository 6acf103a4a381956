//! Per-engine trigger DDL
//!
//! Every engine gets the same logical trigger: on each row UPDATE the version
//! column ends up as `OLD.version + 1`, whatever value the statement itself
//! tried to write. How that is expressed differs:
//!
//! | Engine | Timing | Mechanism |
//! |---|---|---|
//! | SQLite | `AFTER UPDATE` | secondary `UPDATE ... WHERE pk = NEW.pk` |
//! | PostgreSQL | `BEFORE UPDATE` | plpgsql function assigning `NEW.version` |
//! | MySQL | `BEFORE UPDATE` | inline `SET NEW.version = OLD.version + 1` |
//!
//! Rendered statements are safe to re-issue: creation drops any previous
//! trigger of the same name first, and removal uses `IF EXISTS`.

mod mysql;
mod postgres;
mod sqlite;


pub use mysql::MySqlTriggers;
pub use postgres::PostgresTriggers;
pub use sqlite::SqliteTriggers;

use std::sync::Arc;

use crate::ColumnDescriptor;

/// Renders the trigger DDL for one engine family
///
/// Implementations are stateless. Bind one to a connection with
/// [`TriggerSession`](crate::TriggerSession) to run the statements.
pub trait TriggerDialect: Send + Sync {
    /// Engine family this dialect renders for
    fn kind(&self) -> DialectKind;

    /// Statements that (re)install the trigger for `descriptor`, in execution order
    fn render_create(&self, descriptor: &ColumnDescriptor) -> Vec<String>;

    /// Statements that remove the trigger for `descriptor` if present
    fn render_drop(&self, descriptor: &ColumnDescriptor) -> Vec<String>;

    /// Query enumerating installed trigger names
    fn render_list(&self) -> String;

    /// Result column of [`render_list`](Self::render_list) holding the trigger name
    fn name_column(&self) -> &'static str;

    /// Quote an identifier for this engine when it needs it
    fn quote(&self, name: &str) -> String {
        self.kind().quote_identifier(name)
    }
}

/// Supported engine families
///
/// # Examples
///
/// ```
/// use verlock_triggers::DialectKind;
///
/// assert_eq!(DialectKind::from_engine("Postgres"), Some(DialectKind::Postgres));
/// assert_eq!(DialectKind::from_engine("oracle"), None);
/// assert_eq!(DialectKind::MySql.quote_identifier("order"), "`order`");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    Sqlite,
    Postgres,
    MySql,
}

impl DialectKind {
    pub const ALL: [DialectKind; 3] = [DialectKind::Sqlite, DialectKind::Postgres, DialectKind::MySql];

    /// Canonical engine identifier
    pub fn id(&self) -> &'static str {
        match self {
            DialectKind::Sqlite => "sqlite",
            DialectKind::Postgres => "postgresql",
            DialectKind::MySql => "mysql",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DialectKind::Sqlite => "SQLite",
            DialectKind::Postgres => "PostgreSQL",
            DialectKind::MySql => "MySQL",
        }
    }

    /// Engine identifiers connections of this family report
    pub fn engine_aliases(&self) -> &'static [&'static str] {
        match self {
            DialectKind::Sqlite => &["sqlite", "sqlite3"],
            DialectKind::Postgres => &["postgresql", "postgres"],
            DialectKind::MySql => &["mysql", "mariadb"],
        }
    }

    /// Resolve an engine identifier (case-insensitive)
    pub fn from_engine(engine: &str) -> Option<Self> {
        let engine = engine.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.engine_aliases().contains(&engine.as_str()))
    }

    /// The built-in dialect for this family
    pub fn strategy(&self) -> Arc<dyn TriggerDialect> {
        match self {
            DialectKind::Sqlite => Arc::new(SqliteTriggers),
            DialectKind::Postgres => Arc::new(PostgresTriggers),
            DialectKind::MySql => Arc::new(MySqlTriggers),
        }
    }

    /// Quote a single identifier when it is not a plain word or is reserved
    ///
    /// PostgreSQL folds unquoted names to lower case, so there any name with
    /// an upper-case letter is quoted as well.
    pub fn quote_identifier(&self, name: &str) -> String {
        let folds_case =
            *self == DialectKind::Postgres && name.chars().any(|c| c.is_ascii_uppercase());
        if !folds_case && !needs_quoting(name) {
            return name.to_string();
        }
        match self {
            DialectKind::Sqlite | DialectKind::Postgres => {
                format!("\"{}\"", name.replace('"', "\"\""))
            }
            DialectKind::MySql => format!("`{}`", name.replace('`', "``")),
        }
    }

    /// Quote a possibly schema-qualified name (`schema.table`) part by part
    pub fn quote_qualified(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Split `schema.table` into its quoted schema (if any) and quoted table
    pub fn quote_split(&self, name: &str) -> (Option<String>, String) {
        match name.rsplit_once('.') {
            Some((schema, table)) => (
                Some(self.quote_qualified(schema)),
                self.quote_identifier(table),
            ),
            None => (None, self.quote_identifier(name)),
        }
    }
}

impl std::fmt::Display for DialectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

fn needs_quoting(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return true;
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return true;
    }
    name.chars().any(|c| !c.is_ascii_alphanumeric() && c != '_')
        || RESERVED_KEYWORDS.contains(&name.to_uppercase().as_str())
}

static RESERVED_KEYWORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "AS", "BEGIN", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN",
    "CONSTRAINT", "CREATE", "DEFAULT", "DELETE", "DISTINCT", "DROP", "EACH", "ELSE", "END",
    "EXISTS", "FOR", "FOREIGN", "FROM", "FUNCTION", "GROUP", "HAVING", "IF", "IN", "INDEX",
    "INSERT", "INTO", "IS", "JOIN", "KEY", "LIKE", "LIMIT", "NEW", "NOT", "NULL", "OFFSET",
    "OLD", "ON", "OR", "ORDER", "PRIMARY", "REFERENCES", "ROW", "SELECT", "SET", "TABLE",
    "THEN", "TO", "TRIGGER", "UNION", "UNIQUE", "UPDATE", "USER", "VALUES", "VIEW", "WHEN",
    "WHERE",
];
