//! Registration registry

use crate::ColumnDescriptor;

/// Descriptors declared so far and not yet consumed by a create pass
///
/// Filled while the schema is being declared, then handed to
/// [`TriggerManager::create_triggers`](crate::TriggerManager::create_triggers),
/// which removes what it installed. Registration order is kept and
/// duplicates are ignored.
#[derive(Debug, Default)]
pub struct TriggerRegistry {
    descriptors: Vec<ColumnDescriptor>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, returning `false` if it was already registered
    ///
    /// A different descriptor resolving to an already registered trigger
    /// name is still registered; the later definition wins on install.
    pub fn register(&mut self, descriptor: ColumnDescriptor) -> bool {
        if self.descriptors.contains(&descriptor) {
            tracing::trace!(trigger = %descriptor.trigger_name(), "descriptor already registered");
            return false;
        }

        let name = descriptor.trigger_name();
        if let Some(existing) = self.descriptors.iter().find(|d| d.trigger_name() == name) {
            tracing::warn!(
                trigger = %name,
                existing_table = %existing.table_name(),
                existing_column = %existing.version_column(),
                table = %descriptor.table_name(),
                column = %descriptor.version_column(),
                "two descriptors resolve to the same trigger name; the later one will replace the earlier"
            );
        }

        tracing::debug!(entity = %descriptor.entity(), trigger = %name, "registered version column");
        self.descriptors.push(descriptor);
        true
    }

    /// All registered descriptors, in registration order
    pub fn all(&self) -> &[ColumnDescriptor] {
        &self.descriptors
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.descriptors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ColumnDescriptor> {
        self.descriptors.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Keep only the descriptors matching `keep`
    pub fn retain(&mut self, keep: impl FnMut(&ColumnDescriptor) -> bool) {
        self.descriptors.retain(keep);
    }

    pub fn clear(&mut self) {
        self.descriptors.clear();
    }
}

impl Extend<ColumnDescriptor> for TriggerRegistry {
    fn extend<I: IntoIterator<Item = ColumnDescriptor>>(&mut self, iter: I) {
        for descriptor in iter {
            self.register(descriptor);
        }
    }
}

impl FromIterator<ColumnDescriptor> for TriggerRegistry {
    fn from_iter<I: IntoIterator<Item = ColumnDescriptor>>(iter: I) -> Self {
        let mut registry = Self::new();
        registry.extend(iter);
        registry
    }
}
