use super::{DialectKind, TriggerDialect};
use crate::ColumnDescriptor;

/// SQLite trigger DDL
///
/// Trigger bodies cannot assign `NEW.<column>`, so an `AFTER UPDATE` trigger
/// re-updates the row by primary key. The nested UPDATE does not fire the
/// trigger again as long as `recursive_triggers` is off (the default).
///
/// SQLite does not accept a qualified table after `ON` or inside a trigger
/// body; for `schema.table` the schema qualifies the trigger name instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTriggers;

impl SqliteTriggers {
    fn trigger_and_table(&self, descriptor: &ColumnDescriptor) -> (String, String) {
        let trigger = self.quote(&descriptor.trigger_name());
        match self.kind().quote_split(descriptor.table_name()) {
            (Some(schema), table) => (format!("{}.{}", schema, trigger), table),
            (None, table) => (trigger, table),
        }
    }
}

impl TriggerDialect for SqliteTriggers {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn render_create(&self, descriptor: &ColumnDescriptor) -> Vec<String> {
        let (trigger, table) = self.trigger_and_table(descriptor);
        let version = self.quote(descriptor.version_column());
        let pk = self.quote(descriptor.primary_key_column());

        vec![
            format!("DROP TRIGGER IF EXISTS {}", trigger),
            format!(
                "CREATE TRIGGER {trigger}\nAFTER UPDATE ON {table}\nFOR EACH ROW\nBEGIN\n    UPDATE {table} SET {version} = OLD.{version} + 1 WHERE {pk} = NEW.{pk};\nEND"
            ),
        ]
    }

    fn render_drop(&self, descriptor: &ColumnDescriptor) -> Vec<String> {
        let (trigger, _) = self.trigger_and_table(descriptor);
        vec![format!("DROP TRIGGER IF EXISTS {}", trigger)]
    }

    fn render_list(&self) -> String {
        "SELECT name FROM sqlite_master WHERE type = 'trigger'".to_string()
    }

    fn name_column(&self) -> &'static str {
        "name"
    }
}
