use crate::storage::{PersistentStore, StorageBackend};
use std::sync::Arc;

pub const WALKTHROUGH_KEY: &str = "app-walkthrough-completed";

/// Remembers whether the user finished the introductory tour.
pub struct Walkthrough {
    store: PersistentStore<bool>,
}

impl Walkthrough {
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            store: PersistentStore::open(backend, WALKTHROUGH_KEY, false),
        }
    }

    pub fn has_completed(&self) -> bool {
        *self.store.get()
    }

    pub fn mark_complete(&mut self) {
        self.store.set(true);
    }

    pub fn reset(&mut self) {
        self.store.set(false);
    }
}
