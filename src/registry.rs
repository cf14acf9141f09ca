//! The live set of environment variables.

use crate::new_id;
use crate::storage::{PersistentStore, StorageBackend};
use chrono::Utc;
use envledger_core::{Environment, EnvironmentVariable, NewVariable, VariableUpdate};
use std::sync::Arc;
use tracing::debug;

pub const VARIABLES_KEY: &str = "env-variables";

/// Owns the current list of variables.
///
/// Every operation is total: unknown ids are ignored, and names are not
/// checked here. Validation happens in `EnvLedger` before a mutation reaches
/// the registry.
pub struct VariableRegistry {
    store: PersistentStore<Vec<EnvironmentVariable>>,
}

impl VariableRegistry {
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            store: PersistentStore::open(backend, VARIABLES_KEY, Vec::new()),
        }
    }

    pub fn variables(&self) -> &[EnvironmentVariable] {
        self.store.get()
    }

    pub fn get(&self, id: &str) -> Option<&EnvironmentVariable> {
        self.variables().iter().find(|v| v.id == id)
    }

    pub fn len(&self) -> usize {
        self.variables().len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables().is_empty()
    }

    /// Stamp `id`, `created_at` and `updated_at`, append, and return the record.
    pub fn add(&mut self, data: NewVariable) -> EnvironmentVariable {
        let variable = EnvironmentVariable::from_new(new_id(), data, Utc::now());
        debug!(id = %variable.id, name = %variable.name, "adding variable");
        self.store.update(|vars| vars.push(variable.clone()));
        variable
    }

    /// Merge `update` into the matching record. Returns the new state, or
    /// `None` without touching storage when the id is unknown.
    pub fn update(&mut self, id: &str, update: &VariableUpdate) -> Option<EnvironmentVariable> {
        self.get(id)?;
        let now = Utc::now();
        self.store.update(|vars| {
            vars.iter_mut().find(|v| v.id == id).map(|v| {
                v.apply(update, now);
                v.clone()
            })
        })
    }

    pub fn delete(&mut self, id: &str) -> Option<EnvironmentVariable> {
        let index = self.variables().iter().position(|v| v.id == id)?;
        Some(self.store.update(|vars| vars.remove(index)))
    }

    /// Remove every matching record, returning them in registry order.
    pub fn delete_many(&mut self, ids: &[String]) -> Vec<EnvironmentVariable> {
        if !self.variables().iter().any(|v| ids.contains(&v.id)) {
            return Vec::new();
        }
        self.store.update(|vars| {
            let (removed, kept): (Vec<_>, Vec<_>) =
                vars.drain(..).partition(|v| ids.contains(&v.id));
            *vars = kept;
            removed
        })
    }

    /// Apply several updates in one pass and one write.
    ///
    /// Updates for unknown ids are skipped. Several updates for the same id
    /// are merged in the order given. Returns the updated records in
    /// registry order.
    pub fn bulk_update(
        &mut self,
        updates: &[(String, VariableUpdate)],
    ) -> Vec<EnvironmentVariable> {
        if !updates.iter().any(|(id, _)| self.get(id).is_some()) {
            return Vec::new();
        }
        let now = Utc::now();
        self.store.update(|vars| {
            let mut updated = Vec::new();
            for var in vars.iter_mut() {
                let var_id = var.id.clone();
                let mut touched = false;
                for (_, update) in updates.iter().filter(|(id, _)| *id == var_id) {
                    var.apply(update, now);
                    touched = true;
                }
                if touched {
                    updated.push(var.clone());
                }
            }
            updated
        })
    }

    /// Variables with a set value in `env`, in registry order.
    pub fn by_environment(&self, env: Environment) -> Vec<&EnvironmentVariable> {
        self.variables().iter().filter(|v| v.has_value(env)).collect()
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }
}
