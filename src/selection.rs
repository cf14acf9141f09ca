//! Bulk selection and temporary reveal of secret values.
//!
//! Selection is persisted. Reveal state is not: a fresh controller always
//! starts with every secret masked.
//!
//! Each revealed id is `Revealed(expires_at)` with a generation number; ids
//! not present are `Hidden`. Re-revealing an id replaces its entry with a
//! new generation and expiry, so a timer handed out earlier for the same id
//! can no longer hide it.

use crate::clock::Clock;
use crate::storage::{PersistentStore, StorageBackend};
use envledger_core::SelectionState;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const SELECTION_KEY: &str = "env-selection";

/// How long a revealed value stays unmasked.
pub const REVEAL_DURATION: Duration = Duration::from_secs(30);

/// Handle for one scheduled auto-hide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealTimer {
    pub var_id: String,
    pub generation: u64,
    pub expires_at: Duration,
}

/// Ephemeral set of unmasked ids, each with exactly one live timer.
pub struct RevealState<C: Clock> {
    clock: C,
    timers: Vec<RevealTimer>,
    next_generation: u64,
}

impl<C: Clock> RevealState<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            timers: Vec::new(),
            next_generation: 0,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Unmask `var_id` and (re)start its countdown.
    pub fn reveal(&mut self, var_id: &str) -> RevealTimer {
        self.next_generation += 1;
        let timer = RevealTimer {
            var_id: var_id.to_string(),
            generation: self.next_generation,
            expires_at: self.clock.now() + REVEAL_DURATION,
        };
        match self.timers.iter_mut().find(|t| t.var_id == var_id) {
            Some(existing) => *existing = timer.clone(),
            None => self.timers.push(timer.clone()),
        }
        debug!(var_id, generation = timer.generation, "revealed");
        timer
    }

    /// Mask `var_id` now and cancel its timer. Returns whether it was revealed.
    pub fn hide(&mut self, var_id: &str) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.var_id != var_id);
        before != self.timers.len()
    }

    /// Cancel every timer and mask everything.
    pub fn hide_all(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        count
    }

    /// Deliver a scheduled timer. Stale timers (the id was hidden or
    /// re-revealed since) are ignored.
    pub fn fire(&mut self, timer: &RevealTimer) -> bool {
        let current = self
            .timers
            .iter()
            .position(|t| t.var_id == timer.var_id && t.generation == timer.generation);
        match current {
            Some(index) => {
                self.timers.remove(index);
                debug!(var_id = %timer.var_id, "reveal expired");
                true
            }
            None => false,
        }
    }

    /// Drop every expired entry and return their ids.
    pub fn tick(&mut self) -> Vec<String> {
        let now = self.clock.now();
        let (expired, live): (Vec<_>, Vec<_>) =
            self.timers.drain(..).partition(|t| t.expires_at <= now);
        self.timers = live;
        expired.into_iter().map(|t| t.var_id).collect()
    }

    pub fn is_revealed(&self, var_id: &str) -> bool {
        let now = self.clock.now();
        self.timers
            .iter()
            .any(|t| t.var_id == var_id && t.expires_at > now)
    }

    /// Currently unmasked ids, in the order they were first revealed.
    pub fn revealed(&self) -> Vec<String> {
        let now = self.clock.now();
        self.timers
            .iter()
            .filter(|t| t.expires_at > now)
            .map(|t| t.var_id.clone())
            .collect()
    }

    /// Number of timers still counting down.
    pub fn pending_timers(&self) -> usize {
        let now = self.clock.now();
        self.timers.iter().filter(|t| t.expires_at > now).count()
    }

    /// Earliest outstanding expiry, for scheduling the next tick.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.iter().map(|t| t.expires_at).min()
    }
}

/// Selection for bulk actions plus the reveal state of secret values.
pub struct SelectionController<C: Clock> {
    store: PersistentStore<SelectionState>,
    reveal: RevealState<C>,
}

impl<C: Clock> SelectionController<C> {
    pub fn open(backend: Arc<dyn StorageBackend>, clock: C) -> Self {
        Self {
            store: PersistentStore::open(backend, SELECTION_KEY, SelectionState::default()),
            reveal: RevealState::new(clock),
        }
    }

    pub fn state(&self) -> &SelectionState {
        self.store.get()
    }

    pub fn selected_ids(&self) -> &[String] {
        &self.state().selected_var_ids
    }

    pub fn bulk_mode(&self) -> bool {
        self.state().bulk_mode
    }

    pub fn is_selected(&self, var_id: &str) -> bool {
        self.selected_ids().iter().any(|id| id == var_id)
    }

    /// Without `multi`, select only `var_id` and enter bulk mode. With
    /// `multi`, toggle `var_id`; bulk mode follows whether anything remains.
    pub fn select(&mut self, var_id: &str, multi: bool) {
        self.store.update(|state| {
            if !multi {
                state.selected_var_ids = vec![var_id.to_string()];
                state.bulk_mode = true;
                return;
            }
            match state.selected_var_ids.iter().position(|id| id == var_id) {
                Some(index) => {
                    state.selected_var_ids.remove(index);
                }
                None => state.selected_var_ids.push(var_id.to_string()),
            }
            state.bulk_mode = !state.selected_var_ids.is_empty();
        });
    }

    pub fn select_all(&mut self, var_ids: &[String]) {
        let mut ids: Vec<String> = Vec::with_capacity(var_ids.len());
        for id in var_ids {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        let bulk_mode = !ids.is_empty();
        self.store.set(SelectionState {
            selected_var_ids: ids,
            bulk_mode,
        });
    }

    pub fn clear_selection(&mut self) {
        self.store.set(SelectionState::default());
    }

    /// Flip bulk mode. Turning it off also clears the selection; turning it
    /// on leaves the selection alone.
    pub fn toggle_bulk_mode(&mut self) {
        self.store.update(|state| {
            if state.bulk_mode {
                state.selected_var_ids.clear();
            }
            state.bulk_mode = !state.bulk_mode;
        });
    }

    /// Drop ids that no longer exist from the selection and reveal state.
    pub fn forget(&mut self, var_ids: &[String]) {
        if self.selected_ids().iter().any(|id| var_ids.contains(id)) {
            self.store.update(|state| {
                state.selected_var_ids.retain(|id| !var_ids.contains(id));
                state.bulk_mode = state.bulk_mode && !state.selected_var_ids.is_empty();
            });
        }
        for id in var_ids {
            self.reveal.hide(id);
        }
    }

    pub fn reveal(&mut self, var_id: &str) -> RevealTimer {
        self.reveal.reveal(var_id)
    }

    pub fn hide(&mut self, var_id: &str) -> bool {
        self.reveal.hide(var_id)
    }

    pub fn hide_all(&mut self) -> usize {
        self.reveal.hide_all()
    }

    pub fn is_revealed(&self, var_id: &str) -> bool {
        self.reveal.is_revealed(var_id)
    }

    pub fn revealed(&self) -> Vec<String> {
        self.reveal.revealed()
    }

    pub fn reveal_state(&self) -> &RevealState<C> {
        &self.reveal
    }

    pub fn reveal_state_mut(&mut self) -> &mut RevealState<C> {
        &mut self.reveal
    }
}

/// Mask a value for display, keeping its length hint bounded.
pub fn mask_value(value: &str) -> String {
    "•".repeat(value.chars().count().clamp(8, 16))
}
