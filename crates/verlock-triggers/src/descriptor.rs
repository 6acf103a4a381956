//! Column descriptors

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::naming::derive_name;

fn default_primary_key() -> String {
    "id".to_string()
}

/// One version-tracked column that needs a managed trigger
///
/// Equality and hashing ignore the advisory `exists` flag, so the same
/// logical column registered twice is recognised as a duplicate whatever
/// state it was last seen in.
///
/// # Examples
///
/// ```
/// use verlock_triggers::ColumnDescriptor;
///
/// let descriptor = ColumnDescriptor::new("Invoice", "invoices", "revision")
///     .with_primary_key("invoice_id");
///
/// assert_eq!(descriptor.trigger_name(), "concurrency_invoices_revision");
/// assert_eq!(descriptor.primary_key_column(), "invoice_id");
/// assert!(!descriptor.exists());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDescriptor {
    entity: String,
    #[serde(rename = "table")]
    table_name: String,
    version_column: String,
    #[serde(rename = "primary_key", default = "default_primary_key")]
    primary_key_column: String,
    #[serde(rename = "trigger_name", default, skip_serializing_if = "Option::is_none")]
    explicit_name: Option<String>,
    #[serde(skip)]
    exists: bool,
}

impl ColumnDescriptor {
    /// Create a descriptor with the default `id` primary key and a derived trigger name
    pub fn new(
        entity: impl Into<String>,
        table_name: impl Into<String>,
        version_column: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            table_name: table_name.into(),
            version_column: version_column.into(),
            primary_key_column: default_primary_key(),
            explicit_name: None,
            exists: false,
        }
    }

    /// Set the primary key column
    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key_column = column.into();
        self
    }

    /// Override the derived trigger name
    pub fn with_trigger_name(mut self, name: impl Into<String>) -> Self {
        self.explicit_name = Some(name.into());
        self
    }

    /// Owning entity, used for write routing
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn version_column(&self) -> &str {
        &self.version_column
    }

    pub fn primary_key_column(&self) -> &str {
        &self.primary_key_column
    }

    /// The explicit trigger name, if one was set
    pub fn explicit_name(&self) -> Option<&str> {
        self.explicit_name.as_deref()
    }

    /// The trigger name this descriptor resolves to
    pub fn trigger_name(&self) -> String {
        derive_name(self)
    }

    /// Whether the trigger was last seen installed
    ///
    /// Advisory only. It goes stale across restarts and external schema
    /// changes; the live trigger list is authoritative.
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn set_exists(&mut self, exists: bool) {
        self.exists = exists;
    }
}

impl PartialEq for ColumnDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
            && self.table_name == other.table_name
            && self.version_column == other.version_column
            && self.primary_key_column == other.primary_key_column
            && self.explicit_name == other.explicit_name
    }
}

impl Eq for ColumnDescriptor {}

impl Hash for ColumnDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity.hash(state);
        self.table_name.hash(state);
        self.version_column.hash(state);
        self.primary_key_column.hash(state);
        self.explicit_name.hash(state);
    }
}
