use crate::{Change, EnvironmentVariable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    VariableCreated,
    VariableUpdated,
    VariableDeleted,
    BulkOperation,
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HistoryAction::VariableCreated => "variable_created",
            HistoryAction::VariableUpdated => "variable_updated",
            HistoryAction::VariableDeleted => "variable_deleted",
            HistoryAction::BulkOperation => "bulk_operation",
        };
        f.write_str(s)
    }
}

/// Immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: HistoryAction,
    pub description: String,
    /// Copies of the changes at record time
    #[serde(default)]
    pub changes: Vec<Change>,
    /// Full registry state at record time, for read-only time travel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables_snapshot: Option<Vec<EnvironmentVariable>>,
}

/// Simplified listing view of a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub action: HistoryAction,
    pub changes_count: usize,
}

impl From<&HistoryEntry> for CommitSummary {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            id: entry.id.clone(),
            timestamp: entry.timestamp,
            message: entry.description.clone(),
            action: entry.action,
            changes_count: entry.changes.len(),
        }
    }
}
