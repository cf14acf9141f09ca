use crate::Environment;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Name,
    Updated,
    Created,
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortBy::Name),
            "updated" => Ok(SortBy::Updated),
            "created" => Ok(SortBy::Created),
            other => Err(format!("Unknown sort key: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("Unknown sort order: {}", other)),
        }
    }
}

/// Persisted search and filter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    #[serde(default)]
    pub search_query: String,
    /// Empty means "no environment filter", not "show nothing"
    #[serde(default = "Environment::all")]
    pub selected_environments: Vec<Environment>,
    #[serde(default)]
    pub show_secrets_only: bool,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            selected_environments: Environment::all(),
            show_secrets_only: false,
            sort_by: SortBy::Name,
            sort_order: SortOrder::Asc,
        }
    }
}

impl FilterState {
    /// True when any narrowing filter differs from its default. Sorting does not count.
    pub fn has_active_filters(&self) -> bool {
        !self.search_query.is_empty()
            || self.selected_environments.len() < Environment::ALL.len()
            || self.show_secrets_only
    }
}

/// Persisted selection for bulk actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    /// Insertion-ordered, no duplicates
    #[serde(default)]
    pub selected_var_ids: Vec<String>,
    #[serde(default)]
    pub bulk_mode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters_inactive() {
        assert!(!FilterState::default().has_active_filters());
    }

    #[test]
    fn test_sort_change_is_not_active_filter() {
        let state = FilterState {
            sort_by: SortBy::Updated,
            sort_order: SortOrder::Desc,
            ..Default::default()
        };
        assert!(!state.has_active_filters());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let state: FilterState = serde_json::from_str(r#"{"searchQuery":"db"}"#).unwrap();
        assert_eq!(state.search_query, "db");
        assert_eq!(state.selected_environments, Environment::all());
        assert_eq!(state.sort_by, SortBy::Name);
    }
}
