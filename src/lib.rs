//! Environment variables staged across development, preview and production.
//!
//! [`EnvLedger`] is the application context. It owns one service object per
//! slice of persisted state and is the only path through which variables are
//! mutated: every create, update or delete is applied to the registry,
//! staged in the current draft change set and recorded in the history log
//! within a single call.

use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod changeset;
pub mod clock;
pub mod config;
pub mod environments;
pub mod error;
pub mod history;
pub mod import;
pub mod notify;
pub mod registry;
pub mod search;
pub mod selection;
pub mod storage;
pub mod walkthrough;

pub use changeset::ChangeSetLedger;
pub use clock::{Clock, ManualClock, SystemClock};
pub use environments::EnvironmentPicker;
pub use error::{EnvLedgerError, Result};
pub use history::{HISTORY_LIMIT, HistoryLog};
pub use import::{ImportFormat, ParseOutcome, ParsedVariable};
pub use notify::{Notification, Notifier, NullNotifier, TracingNotifier};
pub use registry::VariableRegistry;
pub use search::SearchEngine;
pub use selection::{REVEAL_DURATION, RevealState, RevealTimer, SelectionController, mask_value};
pub use storage::{FileStorage, MemoryStorage, PersistentStore, StorageBackend, StorageRegistry};
pub use walkthrough::Walkthrough;

// Re-export types for convenience
pub use envledger_core::*;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Outcome of marking a change set applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub change_set: ChangeSet,
    /// Advisory only; applying never waits on them.
    pub conflicts: Vec<Conflict>,
}

impl ApplyReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

pub struct EnvLedger<C: Clock = SystemClock> {
    registry: VariableRegistry,
    change_sets: ChangeSetLedger,
    history: HistoryLog,
    selection: SelectionController<C>,
    search: SearchEngine,
    environments: EnvironmentPicker,
    walkthrough: Walkthrough,
    notifier: Arc<dyn Notifier>,
}

impl EnvLedger<SystemClock> {
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_clock(backend, SystemClock::new())
    }
}

impl<C: Clock> EnvLedger<C> {
    /// Load every slice of state from `backend`, driving reveal timers with `clock`.
    pub fn with_clock(backend: Arc<dyn StorageBackend>, clock: C) -> Self {
        Self {
            registry: VariableRegistry::open(backend.clone()),
            change_sets: ChangeSetLedger::open(backend.clone()),
            history: HistoryLog::open(backend.clone()),
            selection: SelectionController::open(backend.clone(), clock),
            search: SearchEngine::open(backend.clone()),
            environments: EnvironmentPicker::open(backend.clone()),
            walkthrough: Walkthrough::open(backend),
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Environments assigned to change sets created from now on.
    pub fn with_default_environments(mut self, environments: Vec<Environment>) -> Self {
        self.change_sets = self.change_sets.with_default_environments(environments);
        self
    }

    pub fn variables(&self) -> &[EnvironmentVariable] {
        self.registry.variables()
    }

    pub fn variable(&self, id: &str) -> Option<&EnvironmentVariable> {
        self.registry.get(id)
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    pub fn change_sets(&self) -> &ChangeSetLedger {
        &self.change_sets
    }

    pub fn change_sets_mut(&mut self) -> &mut ChangeSetLedger {
        &mut self.change_sets
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryLog {
        &mut self.history
    }

    pub fn selection(&self) -> &SelectionController<C> {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionController<C> {
        &mut self.selection
    }

    pub fn search(&self) -> &SearchEngine {
        &self.search
    }

    pub fn search_mut(&mut self) -> &mut SearchEngine {
        &mut self.search
    }

    pub fn environments(&self) -> &EnvironmentPicker {
        &self.environments
    }

    pub fn environments_mut(&mut self) -> &mut EnvironmentPicker {
        &mut self.environments
    }

    pub fn walkthrough(&self) -> &Walkthrough {
        &self.walkthrough
    }

    pub fn walkthrough_mut(&mut self) -> &mut Walkthrough {
        &mut self.walkthrough
    }

    /// The registry seen through the current search filters.
    pub fn filtered_variables(&self) -> Vec<EnvironmentVariable> {
        self.search.filter(self.registry.variables())
    }

    pub fn create_variable(&mut self, data: NewVariable) -> Result<EnvironmentVariable> {
        data.validate().map_err(EnvLedgerError::Validation)?;

        let variable = self.registry.add(data);
        let change = self.change_sets.add_change(ChangeDraft::for_create(&variable));
        self.record(
            HistoryAction::VariableCreated,
            format!("Created variable {}", variable.name),
            vec![change],
        );
        info!(id = %variable.id, name = %variable.name, "variable created");
        self.notify(
            "Variable Added",
            format!("{} has been added successfully", variable.name),
        );
        Ok(variable)
    }

    /// Merge `update` into a variable.
    ///
    /// Returns `Ok(None)` for an unknown id. An update that would leave the
    /// variable without any non-blank value is rejected.
    pub fn update_variable(
        &mut self,
        id: &str,
        update: &VariableUpdate,
    ) -> Result<Option<EnvironmentVariable>> {
        update.validate().map_err(EnvLedgerError::Validation)?;
        let Some(before) = self.registry.get(id).cloned() else {
            warn!(id, "update for unknown variable ignored");
            return Ok(None);
        };
        check_values(&before, std::slice::from_ref(update))?;

        let Some(after) = self.registry.update(id, update) else {
            return Ok(None);
        };
        if let Some(draft) = ChangeDraft::for_update(&before, &after) {
            let change = self.change_sets.add_change(draft);
            self.record(
                HistoryAction::VariableUpdated,
                format!("Updated variable {}", after.name),
                vec![change],
            );
        } else {
            debug!(id, "update produced no visible change");
        }
        self.notify(
            "Variable Updated",
            format!("{} has been updated successfully", after.name),
        );
        Ok(Some(after))
    }

    /// Delete a variable. Deleting an unknown id is a no-op.
    pub fn delete_variable(&mut self, id: &str) -> Option<EnvironmentVariable> {
        let Some(variable) = self.registry.delete(id) else {
            warn!(id, "delete for unknown variable ignored");
            return None;
        };
        self.selection.forget(std::slice::from_ref(&variable.id));
        let change = self.change_sets.add_change(ChangeDraft::for_delete(&variable));
        self.record(
            HistoryAction::VariableDeleted,
            format!("Deleted variable {}", variable.name),
            vec![change],
        );
        self.notify(
            "Variable Deleted",
            format!("{} has been deleted", variable.name),
        );
        Some(variable)
    }

    /// Delete every matching variable as one bulk operation.
    pub fn delete_variables(&mut self, ids: &[String]) -> Vec<EnvironmentVariable> {
        let removed = self.registry.delete_many(ids);
        if removed.is_empty() {
            return removed;
        }
        let removed_ids: Vec<String> = removed.iter().map(|v| v.id.clone()).collect();
        self.selection.forget(&removed_ids);

        let changes = removed
            .iter()
            .map(|v| self.change_sets.add_change(ChangeDraft::for_delete(v)))
            .collect();
        self.record(
            HistoryAction::BulkOperation,
            format!("Deleted {} variables", removed.len()),
            changes,
        );
        self.notify(
            "Variables Deleted",
            format!("{} variables have been deleted", removed.len()),
        );
        removed
    }

    /// Apply several updates as one bulk operation. Every update is
    /// validated against its target before anything is written.
    pub fn bulk_update(
        &mut self,
        updates: &[(String, VariableUpdate)],
    ) -> Result<Vec<EnvironmentVariable>> {
        self.bulk_update_with(updates, |count| format!("Bulk updated {} variables", count))
    }

    /// Copy or move values between environments for the listed variables.
    ///
    /// Variables without a value in the source environment are skipped.
    pub fn transfer(&mut self, operation: &TransferOperation) -> Result<Vec<EnvironmentVariable>> {
        if operation.source_env == operation.target_env {
            return Err(EnvLedgerError::Validation(vec![
                "Source and target environments must differ".into(),
            ]));
        }

        let updates: Vec<(String, VariableUpdate)> = operation
            .var_ids
            .iter()
            .filter_map(|id| {
                let value = self.registry.get(id)?.value(operation.source_env)?;
                let mut update = VariableUpdate::new().value(operation.target_env, value);
                if operation.kind == TransferKind::Move {
                    update = update.unset(operation.source_env);
                }
                Some((id.clone(), update))
            })
            .collect();

        let verb = match operation.kind {
            TransferKind::Copy => "Copied",
            TransferKind::Move => "Moved",
        };
        let (source, target) = (operation.source_env, operation.target_env);
        self.bulk_update_with(&updates, |count| {
            format!("{} {} variables from {} to {}", verb, count, source, target)
        })
    }

    fn bulk_update_with(
        &mut self,
        updates: &[(String, VariableUpdate)],
        describe: impl FnOnce(usize) -> String,
    ) -> Result<Vec<EnvironmentVariable>> {
        let mut errors = Vec::new();
        let mut befores = Vec::new();
        for (id, update) in updates {
            if let Err(e) = update.validate() {
                errors.extend(e);
            }
            if befores.iter().any(|b: &EnvironmentVariable| b.id == *id) {
                continue;
            }
            if let Some(before) = self.registry.get(id) {
                befores.push(before.clone());
            }
        }
        for before in &befores {
            let patches: Vec<VariableUpdate> = updates
                .iter()
                .filter(|(id, _)| *id == before.id)
                .map(|(_, u)| u.clone())
                .collect();
            if let Err(EnvLedgerError::Validation(e)) = check_values(before, &patches) {
                errors.extend(e.into_iter().map(|msg| format!("{}: {}", before.name, msg)));
            }
        }
        if !errors.is_empty() {
            return Err(EnvLedgerError::Validation(errors));
        }

        let updated = self.registry.bulk_update(updates);
        if updated.is_empty() {
            return Ok(updated);
        }
        let changes: Vec<Change> = updated
            .iter()
            .filter_map(|after| {
                let before = befores.iter().find(|b| b.id == after.id)?;
                ChangeDraft::for_update(before, after)
            })
            .map(|draft| self.change_sets.add_change(draft))
            .collect();
        self.record(HistoryAction::BulkOperation, describe(updated.len()), changes);
        self.notify(
            "Bulk Update Complete",
            format!("{} variables have been updated", updated.len()),
        );
        Ok(updated)
    }

    /// Parse `text` and create one variable per entry with the same value in
    /// every listed environment.
    ///
    /// Nothing is written unless the whole batch parses and validates.
    pub fn import(
        &mut self,
        text: &str,
        format: ImportFormat,
        environments: &[Environment],
        secret: bool,
    ) -> Result<Vec<EnvironmentVariable>> {
        if environments.is_empty() {
            return Err(EnvLedgerError::Import(vec![
                "Please select at least one environment".into(),
            ]));
        }
        if text.trim().is_empty() {
            return Err(EnvLedgerError::Import(vec![
                "Please provide variables in either JSON or KEY=VALUE format".into(),
            ]));
        }

        let outcome = import::parse(text, format);
        if !outcome.is_success() {
            return Err(EnvLedgerError::Import(outcome.errors));
        }
        if outcome.variables.is_empty() {
            return Err(EnvLedgerError::Import(vec!["No variables found to add".into()]));
        }

        let mut errors = Vec::new();
        let mut batch = Vec::with_capacity(outcome.variables.len());
        for parsed in outcome.variables {
            let mut data =
                NewVariable::new(parsed.name).secret(parsed.is_secret.unwrap_or(secret));
            for env in environments {
                data = data.value(*env, parsed.value.clone());
            }
            match data.validate() {
                Ok(()) => batch.push(data),
                Err(e) => errors.extend(e.into_iter().map(|msg| format!("{}: {}", data.name, msg))),
            }
        }
        if !errors.is_empty() {
            return Err(EnvLedgerError::Import(errors));
        }

        let mut created = Vec::with_capacity(batch.len());
        let mut changes = Vec::with_capacity(batch.len());
        for data in batch {
            let variable = self.registry.add(data);
            changes.push(self.change_sets.add_change(ChangeDraft::for_create(&variable)));
            created.push(variable);
        }
        self.record(
            HistoryAction::BulkOperation,
            format!("Imported {} variables", created.len()),
            changes,
        );
        self.notify(
            "Variables Imported",
            format!("{} variables have been added", created.len()),
        );
        Ok(created)
    }

    /// Render `KEY=value` lines for `env`. An empty id list exports everything.
    pub fn export(&self, ids: &[String], env: Environment) -> String {
        import::export_variables(
            self.registry
                .variables()
                .iter()
                .filter(|v| ids.is_empty() || ids.contains(&v.id)),
            env,
        )
    }

    /// Detect conflicts against the live registry, then mark the set applied.
    pub fn apply_change_set(&mut self, change_set_id: &str) -> Option<ApplyReport> {
        let conflicts = self
            .change_sets
            .detect_conflicts(change_set_id, self.registry.variables());
        for conflict in &conflicts {
            warn!(
                var = %conflict.var_name,
                kind = ?conflict.kind,
                "{}",
                conflict.details
            );
        }
        let Some(change_set) = self.change_sets.apply_change_set(change_set_id) else {
            warn!(change_set_id, "apply for unknown change set ignored");
            return None;
        };
        self.notify(
            "Changes Applied",
            format!(
                "{} changes from {} have been applied",
                change_set.changes.len(),
                change_set.name
            ),
        );
        Some(ApplyReport {
            change_set,
            conflicts,
        })
    }

    pub fn apply_current_change_set(&mut self) -> Option<ApplyReport> {
        let id = self.change_sets.current_change_set()?.id.clone();
        self.apply_change_set(&id)
    }

    pub fn delete_change_set(&mut self, change_set_id: &str) -> Option<ChangeSet> {
        self.change_sets.delete_change_set(change_set_id)
    }

    /// Read-only view of the registry as recorded by a history entry.
    pub fn time_travel(&self, entry_id: &str) -> Option<&[EnvironmentVariable]> {
        self.history.snapshot(entry_id)
    }

    fn record(&mut self, action: HistoryAction, description: String, changes: Vec<Change>) {
        let snapshot = self.registry.variables().to_vec();
        self.history
            .add_history_entry(action, description, changes, Some(snapshot));
    }

    fn notify(&self, title: &str, description: String) {
        self.notifier.notify(Notification::new(title, description));
    }
}

/// Preview `patches` against `before` and require a non-blank value to remain.
fn check_values(before: &EnvironmentVariable, patches: &[VariableUpdate]) -> Result<()> {
    let mut preview = before.clone();
    for patch in patches {
        preview.apply(patch, preview.updated_at);
    }
    validate_environment_values(&preview.values)
        .map_err(|e| EnvLedgerError::Validation(vec![e]))
}
