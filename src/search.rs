//! Filtered, sorted views over the variable list.

use crate::storage::{PersistentStore, StorageBackend};
use envledger_core::{Environment, EnvironmentVariable, FilterState, SortBy, SortOrder};
use std::cmp::Ordering;
use std::sync::Arc;

pub const FILTERS_KEY: &str = "env-search-filters";

/// Case-insensitive substring match on name, description or any value.
/// An empty query matches everything.
pub fn matches_query(variable: &EnvironmentVariable, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let query = query.to_lowercase();
    variable.name.to_lowercase().contains(&query)
        || variable
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&query))
        || variable
            .values
            .values()
            .any(|v| v.to_lowercase().contains(&query))
}

/// Keep variables with a set value in at least one of `environments`.
/// An empty list applies no filter.
pub fn matches_environments(variable: &EnvironmentVariable, environments: &[Environment]) -> bool {
    environments.is_empty() || environments.iter().any(|env| variable.has_value(*env))
}

pub fn matches_secrets(variable: &EnvironmentVariable, secrets_only: bool) -> bool {
    !secrets_only || variable.is_secret
}

fn compare(a: &EnvironmentVariable, b: &EnvironmentVariable, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::Name => a.name.cmp(&b.name),
        SortBy::Updated => a.updated_at.cmp(&b.updated_at),
        SortBy::Created => a.created_at.cmp(&b.created_at),
    }
}

/// Run the text, environment and secrets filters, then a stable sort.
///
/// Descending order reverses the comparator, so ties keep their input order
/// in both directions.
pub fn apply_filters(
    variables: &[EnvironmentVariable],
    filters: &FilterState,
) -> Vec<EnvironmentVariable> {
    let mut filtered: Vec<EnvironmentVariable> = variables
        .iter()
        .filter(|v| matches_query(v, &filters.search_query))
        .filter(|v| matches_environments(v, &filters.selected_environments))
        .filter(|v| matches_secrets(v, filters.show_secrets_only))
        .cloned()
        .collect();

    filtered.sort_by(|a, b| {
        let ordering = compare(a, b, filters.sort_by);
        match filters.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
    filtered
}

/// Owns the persisted filter state.
pub struct SearchEngine {
    store: PersistentStore<FilterState>,
}

impl SearchEngine {
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            store: PersistentStore::open(backend, FILTERS_KEY, FilterState::default()),
        }
    }

    pub fn filters(&self) -> &FilterState {
        self.store.get()
    }

    pub fn filter(&self, variables: &[EnvironmentVariable]) -> Vec<EnvironmentVariable> {
        apply_filters(variables, self.filters())
    }

    pub fn has_active_filters(&self) -> bool {
        self.filters().has_active_filters()
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        self.store.update(|f| f.search_query = query);
    }

    /// Replace the environment selection, dropping repeats.
    pub fn set_selected_environments(&mut self, environments: &[Environment]) {
        let mut selected: Vec<Environment> = Vec::new();
        for env in environments {
            if !selected.contains(env) {
                selected.push(*env);
            }
        }
        self.store.update(|f| f.selected_environments = selected);
    }

    /// Remove `env` if selected, otherwise append it.
    pub fn toggle_environment(&mut self, env: Environment) {
        self.store.update(|f| toggle(&mut f.selected_environments, env));
    }

    pub fn set_show_secrets_only(&mut self, secrets_only: bool) {
        self.store.update(|f| f.show_secrets_only = secrets_only);
    }

    pub fn set_sort_by(&mut self, sort_by: SortBy) {
        self.store.update(|f| f.sort_by = sort_by);
    }

    pub fn set_sort_order(&mut self, sort_order: SortOrder) {
        self.store.update(|f| f.sort_order = sort_order);
    }

    pub fn clear_filters(&mut self) {
        self.store.set(FilterState::default());
    }
}

/// Symmetric toggle that keeps the order of the rest and appends on re-add.
pub(crate) fn toggle(environments: &mut Vec<Environment>, env: Environment) {
    match environments.iter().position(|e| *e == env) {
        Some(index) => {
            environments.remove(index);
        }
        None => environments.push(env),
    }
}
