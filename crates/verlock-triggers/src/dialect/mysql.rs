use super::{DialectKind, TriggerDialect};
use crate::ColumnDescriptor;

/// MySQL / MariaDB trigger DDL
///
/// Single-statement body, so no `DELIMITER` juggling is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlTriggers;

impl TriggerDialect for MySqlTriggers {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn render_create(&self, descriptor: &ColumnDescriptor) -> Vec<String> {
        let trigger = self.quote(&descriptor.trigger_name());
        let table = self.kind().quote_qualified(descriptor.table_name());
        let version = self.quote(descriptor.version_column());

        vec![
            format!("DROP TRIGGER IF EXISTS {}", trigger),
            format!(
                "CREATE TRIGGER {trigger}\nBEFORE UPDATE ON {table}\nFOR EACH ROW\nSET NEW.{version} = OLD.{version} + 1"
            ),
        ]
    }

    fn render_drop(&self, descriptor: &ColumnDescriptor) -> Vec<String> {
        vec![format!(
            "DROP TRIGGER IF EXISTS {}",
            self.quote(&descriptor.trigger_name())
        )]
    }

    fn render_list(&self) -> String {
        "SHOW TRIGGERS".to_string()
    }

    fn name_column(&self) -> &'static str {
        "Trigger"
    }
}
