//! Bounded audit log with optional full-state snapshots.

use crate::new_id;
use crate::storage::{PersistentStore, StorageBackend};
use chrono::Utc;
use envledger_core::{Change, CommitSummary, EnvironmentVariable, HistoryAction, HistoryEntry};
use std::sync::Arc;

pub const HISTORY_KEY: &str = "env-history";

/// Maximum number of retained entries. Older entries are dropped for good.
pub const HISTORY_LIMIT: usize = 50;

/// Newest-first audit log; index 0 is always the latest entry.
pub struct HistoryLog {
    store: PersistentStore<Vec<HistoryEntry>>,
}

impl HistoryLog {
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            store: PersistentStore::open(backend, HISTORY_KEY, Vec::new()),
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        self.store.get()
    }

    pub fn add_history_entry(
        &mut self,
        action: HistoryAction,
        description: impl Into<String>,
        changes: Vec<Change>,
        variables_snapshot: Option<Vec<EnvironmentVariable>>,
    ) -> HistoryEntry {
        let entry = HistoryEntry {
            id: new_id(),
            timestamp: Utc::now(),
            action,
            description: description.into(),
            changes,
            variables_snapshot,
        };
        self.store.update(|entries| {
            entries.insert(0, entry.clone());
            entries.truncate(HISTORY_LIMIT);
        });
        entry
    }

    pub fn commit_history(&self) -> Vec<CommitSummary> {
        self.entries().iter().map(CommitSummary::from).collect()
    }

    pub fn commit_details(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries().iter().find(|e| e.id == id)
    }

    pub fn can_time_travel(&self, id: &str) -> bool {
        self.snapshot(id).is_some()
    }

    /// The registry state recorded with an entry, if any.
    pub fn snapshot(&self, id: &str) -> Option<&[EnvironmentVariable]> {
        self.commit_details(id)?.variables_snapshot.as_deref()
    }

    pub fn clear_history(&mut self) {
        self.store.set(Vec::new());
    }
}
