//! Persisted environment picker shared by forms and bulk actions.

use crate::search::toggle;
use crate::storage::{PersistentStore, StorageBackend};
use envledger_core::Environment;
use std::sync::Arc;

pub const ENVIRONMENTS_KEY: &str = "selected-environments";

pub struct EnvironmentPicker {
    store: PersistentStore<Vec<Environment>>,
}

impl EnvironmentPicker {
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            store: PersistentStore::open(backend, ENVIRONMENTS_KEY, Environment::all()),
        }
    }

    pub fn selected(&self) -> &[Environment] {
        self.store.get()
    }

    pub fn is_selected(&self, env: Environment) -> bool {
        self.selected().contains(&env)
    }

    pub fn has_selection(&self) -> bool {
        !self.selected().is_empty()
    }

    pub fn toggle(&mut self, env: Environment) {
        self.store.update(|selected| toggle(selected, env));
    }

    pub fn set(&mut self, environments: Vec<Environment>) {
        self.store.set(environments);
    }

    pub fn select_all(&mut self) {
        self.store.set(Environment::all());
    }

    pub fn clear(&mut self) {
        self.store.set(Vec::new());
    }
}
