//! Trigger naming

use crate::ColumnDescriptor;

/// Prefix of every derived trigger name
pub const TRIGGER_PREFIX: &str = "concurrency_";

/// Name of the trigger managing `descriptor`'s version column
///
/// An explicit name is returned verbatim; it is up to the caller to keep it
/// unique and legal for the engine.
///
/// # Examples
///
/// ```
/// use verlock_triggers::{ColumnDescriptor, derive_name};
///
/// let derived = ColumnDescriptor::new("Order", "orders", "version");
/// assert_eq!(derive_name(&derived), "concurrency_orders_version");
///
/// let explicit = derived.clone().with_trigger_name("orders_bump");
/// assert_eq!(derive_name(&explicit), "orders_bump");
/// ```
pub fn derive_name(descriptor: &ColumnDescriptor) -> String {
    match descriptor.explicit_name() {
        Some(name) => name.to_string(),
        None => format!(
            "{}{}_{}",
            TRIGGER_PREFIX,
            descriptor.table_name(),
            descriptor.version_column()
        ),
    }
}
