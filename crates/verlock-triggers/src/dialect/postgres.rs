use super::{DialectKind, TriggerDialect};
use crate::{ColumnDescriptor, TRIGGER_PREFIX};

/// PostgreSQL trigger DDL
///
/// A plpgsql function named `func_<trigger>` rewrites `NEW.<version>` and a
/// `BEFORE UPDATE` row trigger calls it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresTriggers;

impl PostgresTriggers {
    /// Name of the function backing `trigger_name`
    pub fn function_name(trigger_name: &str) -> String {
        format!("func_{}", trigger_name)
    }
}

impl TriggerDialect for PostgresTriggers {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn render_create(&self, descriptor: &ColumnDescriptor) -> Vec<String> {
        let name = descriptor.trigger_name();
        let trigger = self.quote(&name);
        let function = self.quote(&Self::function_name(&name));
        let table = self.kind().quote_qualified(descriptor.table_name());
        let version = self.quote(descriptor.version_column());

        vec![
            format!(
                "CREATE OR REPLACE FUNCTION {function}()\nRETURNS TRIGGER AS $$\nBEGIN\n    NEW.{version} = OLD.{version} + 1;\n    RETURN NEW;\nEND;\n$$ LANGUAGE plpgsql"
            ),
            format!("DROP TRIGGER IF EXISTS {} ON {}", trigger, table),
            format!(
                "CREATE TRIGGER {trigger}\nBEFORE UPDATE ON {table}\nFOR EACH ROW\nEXECUTE PROCEDURE {function}()"
            ),
        ]
    }

    fn render_drop(&self, descriptor: &ColumnDescriptor) -> Vec<String> {
        let name = descriptor.trigger_name();
        vec![
            format!(
                "DROP TRIGGER IF EXISTS {} ON {}",
                self.quote(&name),
                self.kind().quote_qualified(descriptor.table_name())
            ),
            format!(
                "DROP FUNCTION IF EXISTS {}()",
                self.quote(&Self::function_name(&name))
            ),
        ]
    }

    fn render_list(&self) -> String {
        // `_` is a LIKE wildcard
        format!(
            "SELECT tgname FROM pg_trigger WHERE NOT tgisinternal AND tgname LIKE '{}%'",
            TRIGGER_PREFIX.replace('_', "\\_")
        )
    }

    fn name_column(&self) -> &'static str {
        "tgname"
    }
}
