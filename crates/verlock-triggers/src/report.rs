//! Per-connection results of manager operations

use std::collections::BTreeMap;

use crate::{ColumnDescriptor, TriggerError};

/// What happened to one descriptor's trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// DDL was executed to install the trigger
    Created,
    /// The trigger was already listed, nothing was executed
    AlreadyInstalled,
    /// Drop statements were executed
    Dropped,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::AlreadyInstalled => "already installed",
            ChangeKind::Dropped => "dropped",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a create/drop report
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerChange {
    pub entity: String,
    pub descriptor: ColumnDescriptor,
    pub trigger_name: String,
    pub kind: ChangeKind,
}

impl TriggerChange {
    pub(crate) fn new(descriptor: &ColumnDescriptor, kind: ChangeKind) -> Self {
        Self {
            entity: descriptor.entity().to_string(),
            trigger_name: descriptor.trigger_name(),
            descriptor: descriptor.clone(),
            kind,
        }
    }
}

/// Results keyed by connection alias, plus the aliases that failed
///
/// Every targeted alias has an entry in the results, even when nothing was
/// done there or it failed part way (successes before the failure are kept).
#[must_use = "an alias report may hold failures"]
#[derive(Debug)]
pub struct AliasReport<T> {
    results: BTreeMap<String, T>,
    failures: BTreeMap<String, TriggerError>,
}

/// Installed trigger names per alias
pub type TriggerListing = AliasReport<Vec<String>>;

/// Created or dropped triggers per alias
pub type TriggerReport = AliasReport<Vec<TriggerChange>>;

impl<T: Default> AliasReport<T> {
    pub(crate) fn for_aliases<'a>(aliases: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            results: aliases
                .into_iter()
                .map(|alias| (alias.to_string(), T::default()))
                .collect(),
            failures: BTreeMap::new(),
        }
    }

    pub(crate) fn entry(&mut self, alias: &str) -> &mut T {
        self.results.entry(alias.to_string()).or_default()
    }
}

impl<T> AliasReport<T> {
    pub(crate) fn record_failure(&mut self, alias: &str, error: TriggerError) {
        tracing::error!(alias = %alias, error = %error, "trigger operation failed for connection");
        self.failures.insert(alias.to_string(), error);
    }

    /// True when no alias failed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn get(&self, alias: &str) -> Option<&T> {
        self.results.get(alias)
    }

    pub fn results(&self) -> &BTreeMap<String, T> {
        &self.results
    }

    pub fn failures(&self) -> &BTreeMap<String, TriggerError> {
        &self.failures
    }

    pub fn failure(&self, alias: &str) -> Option<&TriggerError> {
        self.failures.get(alias)
    }

    /// Targeted aliases, sorted
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(|s| s.as_str())
    }

    /// The results, or the first failure (by alias) scoped to its alias
    pub fn into_result(self) -> Result<BTreeMap<String, T>, TriggerError> {
        match self.failures.into_iter().next() {
            Some((alias, source)) => Err(TriggerError::Connection {
                alias,
                source: Box::new(source),
            }),
            None => Ok(self.results),
        }
    }

    pub fn into_parts(self) -> (BTreeMap<String, T>, BTreeMap<String, TriggerError>) {
        (self.results, self.failures)
    }
}
