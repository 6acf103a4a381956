//! Trigger manager
//!
//! Runs list/create/drop across the connections of a [`ConnectionSet`],
//! grouping descriptors by the alias their entity writes to. Work is strictly
//! sequential: alias by alias, then descriptor by descriptor in registration
//! order. Nothing is wrapped in a transaction, so a failure part way through
//! an alias leaves earlier triggers in place; the report says which.

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use crate::{
    AliasReport, ChangeKind, ConnectionSet, DefaultRouter, DialectSelector, TriggerChange,
    TriggerError, TriggerListing, TriggerRegistry, TriggerReport, TriggerSession, WriteRouter,
};

/// Manages version triggers on a set of borrowed connections
pub struct TriggerManager<'a> {
    connections: &'a ConnectionSet,
    router: Box<dyn WriteRouter + 'a>,
    selector: DialectSelector,
}

impl<'a> TriggerManager<'a> {
    /// Create a manager routing every entity to the default alias
    pub fn new(connections: &'a ConnectionSet) -> Self {
        Self {
            connections,
            router: Box::new(DefaultRouter),
            selector: DialectSelector::with_defaults(),
        }
    }

    /// Use `router` to find each entity's write connection
    pub fn with_router(mut self, router: impl WriteRouter + 'a) -> Self {
        self.router = Box::new(router);
        self
    }

    /// Use a custom dialect selector
    pub fn with_selector(mut self, selector: DialectSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn connections(&self) -> &ConnectionSet {
        self.connections
    }

    pub fn selector(&self) -> &DialectSelector {
        &self.selector
    }

    /// The alias receiving writes for `entity`
    pub fn write_alias(&self, entity: &str) -> String {
        self.router.db_for_write(entity)
    }

    /// Bind the right dialect to the connection behind `alias`
    pub fn session(&self, alias: &str) -> Result<TriggerSession, TriggerError> {
        let connection = self
            .connections
            .get(alias)
            .ok_or_else(|| TriggerError::UnknownConnection {
                alias: alias.to_string(),
            })?;
        self.selector.select(connection.clone())
    }

    /// Installed trigger names per alias
    #[tracing::instrument(skip(self))]
    pub async fn list_triggers(&self, aliases: Option<&[&str]>) -> TriggerListing {
        let targets = self.targets(aliases);
        let mut report: TriggerListing =
            AliasReport::for_aliases(targets.iter().map(String::as_str));

        for alias in &targets {
            let listed = match self.session(alias) {
                Ok(session) => session.list().await,
                Err(e) => Err(e),
            };
            match listed {
                Ok(names) => {
                    tracing::debug!(alias = %alias, count = names.len(), "listed triggers");
                    *report.entry(alias) = names;
                }
                Err(e) => report.record_failure(alias, e),
            }
        }

        report
    }

    /// Install triggers for the registered descriptors routed to the target aliases
    ///
    /// Descriptors routed elsewhere are left alone. When every alias succeeds
    /// the processed descriptors are removed from `registry`, so calling this
    /// again is a no-op until something new is registered.
    #[tracing::instrument(skip(self, registry), fields(descriptors = registry.len()))]
    pub async fn create_triggers(
        &self,
        registry: &mut TriggerRegistry,
        aliases: Option<&[&str]>,
    ) -> TriggerReport {
        let targets = self.targets(aliases);
        let mut report: TriggerReport =
            AliasReport::for_aliases(targets.iter().map(String::as_str));
        self.warn_unrouted(registry, &targets);

        for alias in &targets {
            if let Err(e) = self.check_alias(alias) {
                report.record_failure(alias, e);
                continue;
            }
            if !self.has_work(registry, alias) {
                tracing::debug!(alias = %alias, "no version columns routed to connection");
                continue;
            }
            let mut changes = Vec::new();
            let outcome = self.create_on(alias, registry, &mut changes).await;
            report.entry(alias).extend(changes);
            if let Err(e) = outcome {
                report.record_failure(alias, e);
            }
        }

        if report.is_complete() {
            let consumed: BTreeSet<&str> = targets.iter().map(String::as_str).collect();
            registry.retain(|d| !consumed.contains(self.write_alias(d.entity()).as_str()));
        } else {
            tracing::warn!("keeping registered version columns after failed create");
        }

        report
    }

    /// Remove triggers for the registered descriptors routed to the target aliases
    ///
    /// The registry itself is left as is.
    #[tracing::instrument(skip(self, registry), fields(descriptors = registry.len()))]
    pub async fn drop_triggers(
        &self,
        registry: &mut TriggerRegistry,
        aliases: Option<&[&str]>,
    ) -> TriggerReport {
        let targets = self.targets(aliases);
        let mut report: TriggerReport =
            AliasReport::for_aliases(targets.iter().map(String::as_str));
        self.warn_unrouted(registry, &targets);

        for alias in &targets {
            if let Err(e) = self.check_alias(alias) {
                report.record_failure(alias, e);
                continue;
            }
            if !self.has_work(registry, alias) {
                tracing::debug!(alias = %alias, "no version columns routed to connection");
                continue;
            }
            let mut changes = Vec::new();
            let outcome = self.drop_on(alias, registry, &mut changes).await;
            report.entry(alias).extend(changes);
            if let Err(e) = outcome {
                report.record_failure(alias, e);
            }
        }

        report
    }

    /// Statements create (or drop, when `drop` is set) would run per routed descriptor
    ///
    /// Nothing is executed and the live trigger list is not consulted.
    pub fn preview(
        &self,
        registry: &TriggerRegistry,
        aliases: Option<&[&str]>,
        drop: bool,
    ) -> AliasReport<Vec<(TriggerChange, Vec<String>)>> {
        let targets = self.targets(aliases);
        let mut report: AliasReport<Vec<(TriggerChange, Vec<String>)>> =
            AliasReport::for_aliases(targets.iter().map(String::as_str));

        for alias in &targets {
            if let Err(e) = self.check_alias(alias) {
                report.record_failure(alias, e);
                continue;
            }
            if !self.has_work(registry, alias) {
                continue;
            }
            let session = match self.session(alias) {
                Ok(session) => session,
                Err(e) => {
                    report.record_failure(alias, e);
                    continue;
                }
            };
            let kind = if drop { ChangeKind::Dropped } else { ChangeKind::Created };
            let entries = registry
                .iter()
                .filter(|d| self.write_alias(d.entity()) == *alias)
                .map(|d| {
                    let statements = if drop {
                        session.preview_drop(d)
                    } else {
                        session.preview_create(d)
                    };
                    (TriggerChange::new(d, kind), statements)
                });
            report.entry(alias).extend(entries);
        }

        report
    }

    async fn create_on(
        &self,
        alias: &str,
        registry: &mut TriggerRegistry,
        changes: &mut Vec<TriggerChange>,
    ) -> Result<(), TriggerError> {
        let session = self.session(alias)?;
        // Only what was installed before the pass; a later descriptor sharing a
        // name with an earlier one replaces its trigger.
        let installed: BTreeSet<String> = session.list().await?.into_iter().collect();

        for descriptor in registry
            .iter_mut()
            .filter(|d| self.router.db_for_write(d.entity()) == alias)
        {
            let kind = session.create_with(descriptor, &installed).await?;
            changes.push(TriggerChange::new(descriptor, kind));
        }
        Ok(())
    }

    async fn drop_on(
        &self,
        alias: &str,
        registry: &mut TriggerRegistry,
        changes: &mut Vec<TriggerChange>,
    ) -> Result<(), TriggerError> {
        let session = self.session(alias)?;

        for descriptor in registry
            .iter_mut()
            .filter(|d| self.router.db_for_write(d.entity()) == alias)
        {
            session.drop(descriptor).await?;
            changes.push(TriggerChange::new(descriptor, ChangeKind::Dropped));
        }
        Ok(())
    }

    fn check_alias(&self, alias: &str) -> Result<(), TriggerError> {
        if self.connections.contains(alias) {
            Ok(())
        } else {
            Err(TriggerError::UnknownConnection {
                alias: alias.to_string(),
            })
        }
    }

    fn has_work(&self, registry: &TriggerRegistry, alias: &str) -> bool {
        registry
            .iter()
            .any(|d| self.router.db_for_write(d.entity()) == alias)
    }

    /// Requested aliases in the order given (duplicates removed), or every known alias
    fn targets(&self, aliases: Option<&[&str]>) -> Vec<String> {
        match aliases {
            Some(aliases) => {
                let mut targets: Vec<String> = Vec::with_capacity(aliases.len());
                for alias in aliases {
                    if !targets.iter().any(|t| t == alias) {
                        targets.push(alias.to_string());
                    }
                }
                targets
            }
            None => self.connections.aliases().into_iter().map(String::from).collect(),
        }
    }

    fn warn_unrouted(&self, registry: &TriggerRegistry, targets: &[String]) {
        for descriptor in registry.iter() {
            let alias = self.write_alias(descriptor.entity());
            if !self.connections.contains(&alias) && !targets.contains(&alias) {
                tracing::warn!(
                    entity = %descriptor.entity(),
                    alias = %alias,
                    trigger = %descriptor.trigger_name(),
                    "version column routed to an unknown connection, skipping"
                );
            }
        }
    }
}
