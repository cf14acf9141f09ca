//! Change sets: named batches of staged diffs.
//!
//! The "current" change set is the first draft found scanning the ledger
//! from the front. New sets are prepended, so when several drafts exist the
//! most recently created one is current, and `get_or_create_current_change_set`
//! follows the same rule.

use crate::new_id;
use crate::storage::{PersistentStore, StorageBackend};
use chrono::Utc;
use envledger_core::{
    Change, ChangeAction, ChangeDraft, ChangeSet, ChangeSetStatus, Conflict, ConflictKind,
    Environment, EnvironmentVariable,
};
use std::sync::Arc;
use tracing::{debug, warn};

pub const CHANGE_SETS_KEY: &str = "env-change-sets";

pub struct ChangeSetLedger {
    store: PersistentStore<Vec<ChangeSet>>,
    default_environments: Vec<Environment>,
}

impl ChangeSetLedger {
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            store: PersistentStore::open(backend, CHANGE_SETS_KEY, Vec::new()),
            default_environments: vec![Environment::Development],
        }
    }

    /// Environments assigned to newly created change sets.
    pub fn with_default_environments(mut self, environments: Vec<Environment>) -> Self {
        self.default_environments = environments;
        self
    }

    /// All change sets, newest first by convention.
    pub fn change_sets(&self) -> &[ChangeSet] {
        self.store.get()
    }

    pub fn get(&self, id: &str) -> Option<&ChangeSet> {
        self.change_sets().iter().find(|cs| cs.id == id)
    }

    /// Create an empty draft at the front of the ledger.
    ///
    /// This does not check for an existing draft; use
    /// `get_or_create_current_change_set` to keep a single draft.
    pub fn create_change_set(&mut self, name: &str, description: Option<String>) -> ChangeSet {
        let change_set = ChangeSet::new(
            new_id(),
            name,
            description,
            self.default_environments.clone(),
            Utc::now(),
        );
        debug!(id = %change_set.id, name, "creating change set");
        self.store.update(|sets| sets.insert(0, change_set.clone()));
        change_set
    }

    /// Append a change to a set. Returns `None` if the set does not exist.
    pub fn add_change_to_set(&mut self, change_set_id: &str, draft: ChangeDraft) -> Option<Change> {
        let status = self.get(change_set_id)?.status;
        if status != ChangeSetStatus::Draft {
            warn!(change_set_id, %status, "appending a change to a non-draft change set");
        }

        let now = Utc::now();
        let change = draft.into_change(new_id(), now);
        self.store.update(|sets| {
            if let Some(cs) = sets.iter_mut().find(|cs| cs.id == change_set_id) {
                cs.changes.push(change.clone());
                cs.updated_at = now;
            }
        });
        Some(change)
    }

    pub fn remove_change_from_set(
        &mut self,
        change_set_id: &str,
        change_id: &str,
    ) -> Option<Change> {
        self.get(change_set_id)?.change(change_id)?;
        self.store.update(|sets| {
            let cs = sets.iter_mut().find(|cs| cs.id == change_set_id)?;
            let index = cs.changes.iter().position(|c| c.id == change_id)?;
            cs.updated_at = Utc::now();
            Some(cs.changes.remove(index))
        })
    }

    /// Replace the environments a set targets. Returns false for an unknown id.
    pub fn update_change_set_environments(
        &mut self,
        change_set_id: &str,
        environments: Vec<Environment>,
    ) -> bool {
        if self.get(change_set_id).is_none() {
            return false;
        }
        self.store.update(|sets| {
            if let Some(cs) = sets.iter_mut().find(|cs| cs.id == change_set_id) {
                cs.environments = environments;
                cs.updated_at = Utc::now();
            }
        });
        true
    }

    /// Mark a set applied and stamp `applied_at`.
    ///
    /// This is bookkeeping only: the changes were already applied to the
    /// registry when they were staged.
    pub fn apply_change_set(&mut self, change_set_id: &str) -> Option<ChangeSet> {
        self.get(change_set_id)?;
        let now = Utc::now();
        self.store.update(|sets| {
            sets.iter_mut().find(|cs| cs.id == change_set_id).map(|cs| {
                cs.status = ChangeSetStatus::Applied;
                cs.applied_at = Some(now);
                cs.updated_at = now;
                cs.clone()
            })
        })
    }

    /// Remove a set along with any unapplied changes.
    pub fn delete_change_set(&mut self, change_set_id: &str) -> Option<ChangeSet> {
        let index = self.change_sets().iter().position(|cs| cs.id == change_set_id)?;
        Some(self.store.update(|sets| sets.remove(index)))
    }

    pub fn current_change_set(&self) -> Option<&ChangeSet> {
        self.change_sets().iter().find(|cs| cs.is_draft())
    }

    pub fn get_or_create_current_change_set(&mut self) -> ChangeSet {
        if let Some(current) = self.current_change_set() {
            return current.clone();
        }
        let name = format!("Changes {}", Utc::now().format("%Y-%m-%d"));
        self.create_change_set(&name, None)
    }

    /// Append to the current draft, creating one if needed.
    pub fn add_change(&mut self, draft: ChangeDraft) -> Change {
        let current = self.get_or_create_current_change_set();
        let now = Utc::now();
        let change = draft.into_change(new_id(), now);
        self.store.update(|sets| {
            if let Some(cs) = sets.iter_mut().find(|cs| cs.id == current.id) {
                cs.changes.push(change.clone());
                cs.updated_at = now;
            }
        });
        change
    }

    /// Compare a set against the live variables.
    ///
    /// For every variable the set touches, the latest staged `after` value
    /// per environment is what the registry should hold now. Any divergence
    /// means the variable was edited outside this set.
    pub fn detect_conflicts(
        &self,
        change_set_id: &str,
        variables: &[EnvironmentVariable],
    ) -> Vec<Conflict> {
        let Some(change_set) = self.get(change_set_id) else {
            return Vec::new();
        };

        // Latest change per variable, in order of first appearance.
        let mut latest: Vec<(&str, &Change)> = Vec::new();
        let mut expected: Vec<(&str, Environment, Option<&str>)> = Vec::new();
        for change in &change_set.changes {
            let Some(var_id) = change.var_id.as_deref() else {
                continue;
            };
            match latest.iter_mut().find(|(id, _)| *id == var_id) {
                Some(slot) => slot.1 = change,
                None => latest.push((var_id, change)),
            }
            for (env, value) in &change.values {
                let after = value.after.as_deref();
                match expected.iter_mut().find(|(id, e, _)| *id == var_id && e == env) {
                    Some(slot) => slot.2 = after,
                    None => expected.push((var_id, *env, after)),
                }
            }
        }

        let mut conflicts = Vec::new();
        for (var_id, change) in latest {
            let live = variables.iter().find(|v| v.id == var_id);
            match (change.action, live) {
                (ChangeAction::Delete, Some(var)) => conflicts.push(Conflict {
                    var_id: var_id.to_string(),
                    var_name: var.name.clone(),
                    environment: None,
                    kind: ConflictKind::MissingVariable,
                    details: "Variable was deleted in this change set but still exists".into(),
                }),
                (ChangeAction::Delete, None) => {}
                (_, None) => conflicts.push(Conflict {
                    var_id: var_id.to_string(),
                    var_name: change.name.clone(),
                    environment: None,
                    kind: ConflictKind::MissingVariable,
                    details: "Variable no longer exists".into(),
                }),
                (_, Some(var)) => {
                    for (_, env, after) in expected.iter().filter(|(id, _, _)| *id == var_id) {
                        if var.value(*env) != *after {
                            conflicts.push(Conflict {
                                var_id: var_id.to_string(),
                                var_name: var.name.clone(),
                                environment: Some(*env),
                                kind: ConflictKind::ConcurrentEdit,
                                details: format!(
                                    "Value in {} was modified outside this change set",
                                    env
                                ),
                            });
                        }
                    }
                }
            }
        }
        conflicts
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }
}
