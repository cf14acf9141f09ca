use crate::{Environment, EnvironmentVariable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Before/after pair for one environment's value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange<T> {
    pub before: T,
    pub after: T,
}

/// Changes to non-value fields of a variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<FieldChange<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<FieldChange<Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_secret: Option<FieldChange<bool>>,
}

impl MetadataChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.is_secret.is_none()
    }
}

/// Immutable diff record describing one mutation intent.
///
/// Changes are never edited after creation; corrections are new changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub id: String,
    /// Absent for variables that do not exist yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_id: Option<String>,
    pub name: String,
    pub action: ChangeAction,
    #[serde(default)]
    pub environments: Vec<Environment>,
    #[serde(default)]
    pub values: BTreeMap<Environment, ValueChange>,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_changes: Option<MetadataChanges>,
}

/// Change data before the ledger stamps an id and timestamp on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDraft {
    pub var_id: Option<String>,
    pub name: String,
    pub action: ChangeAction,
    pub environments: Vec<Environment>,
    pub values: BTreeMap<Environment, ValueChange>,
    pub is_secret: bool,
    pub description: Option<String>,
    pub metadata_changes: Option<MetadataChanges>,
}

impl ChangeDraft {
    /// A bare draft with no value diffs.
    pub fn new(name: impl Into<String>, action: ChangeAction) -> Self {
        Self {
            var_id: None,
            name: name.into(),
            action,
            environments: Vec::new(),
            values: BTreeMap::new(),
            is_secret: false,
            description: None,
            metadata_changes: None,
        }
    }

    /// Diff for a freshly created variable: every set value goes from absent to present.
    pub fn for_create(var: &EnvironmentVariable) -> Self {
        let values = var
            .values
            .iter()
            .map(|(env, value)| {
                (
                    *env,
                    ValueChange {
                        before: None,
                        after: Some(value.clone()),
                    },
                )
            })
            .collect();

        Self {
            var_id: Some(var.id.clone()),
            name: var.name.clone(),
            action: ChangeAction::Create,
            environments: var.environments(),
            values,
            is_secret: var.is_secret,
            description: var.description.clone(),
            metadata_changes: None,
        }
    }

    /// Diff between two states of the same variable, or `None` when nothing changed.
    pub fn for_update(before: &EnvironmentVariable, after: &EnvironmentVariable) -> Option<Self> {
        let mut environments = Vec::new();
        let mut values = BTreeMap::new();
        for env in Environment::ALL {
            let old = before.values.get(&env);
            let new = after.values.get(&env);
            if old != new {
                environments.push(env);
                values.insert(
                    env,
                    ValueChange {
                        before: old.cloned(),
                        after: new.cloned(),
                    },
                );
            }
        }

        let mut metadata = MetadataChanges::default();
        if before.name != after.name {
            metadata.name = Some(FieldChange {
                before: before.name.clone(),
                after: after.name.clone(),
            });
        }
        if before.description != after.description {
            metadata.description = Some(FieldChange {
                before: before.description.clone(),
                after: after.description.clone(),
            });
        }
        if before.is_secret != after.is_secret {
            metadata.is_secret = Some(FieldChange {
                before: before.is_secret,
                after: after.is_secret,
            });
        }

        if environments.is_empty() && metadata.is_empty() {
            return None;
        }

        Some(Self {
            var_id: Some(after.id.clone()),
            name: after.name.clone(),
            action: ChangeAction::Update,
            environments,
            values,
            is_secret: after.is_secret,
            description: after.description.clone(),
            metadata_changes: (!metadata.is_empty()).then_some(metadata),
        })
    }

    /// Diff for a removed variable: every set value goes from present to absent.
    pub fn for_delete(var: &EnvironmentVariable) -> Self {
        let values = var
            .values
            .iter()
            .map(|(env, value)| {
                (
                    *env,
                    ValueChange {
                        before: Some(value.clone()),
                        after: None,
                    },
                )
            })
            .collect();

        Self {
            var_id: Some(var.id.clone()),
            name: var.name.clone(),
            action: ChangeAction::Delete,
            environments: var.environments(),
            values,
            is_secret: var.is_secret,
            description: var.description.clone(),
            metadata_changes: None,
        }
    }

    pub fn into_change(self, id: String, timestamp: DateTime<Utc>) -> Change {
        Change {
            id,
            var_id: self.var_id,
            name: self.name,
            action: self.action,
            environments: self.environments,
            values: self.values,
            is_secret: self.is_secret,
            description: self.description,
            timestamp,
            metadata_changes: self.metadata_changes,
        }
    }
}

/// Change set lifecycle.
///
/// Only `Draft -> Applied` is driven by the ledger; `Ready` and `Reverted`
/// are accepted in stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSetStatus {
    Draft,
    Ready,
    Applied,
    Reverted,
}

impl std::fmt::Display for ChangeSetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeSetStatus::Draft => "draft",
            ChangeSetStatus::Ready => "ready",
            ChangeSetStatus::Applied => "applied",
            ChangeSetStatus::Reverted => "reverted",
        };
        f.write_str(s)
    }
}

/// A named, ordered batch of changes reviewed as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Insertion order is display order
    #[serde(default)]
    pub changes: Vec<Change>,
    #[serde(default)]
    pub environments: Vec<Environment>,
    pub status: ChangeSetStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
}

impl ChangeSet {
    /// An empty draft.
    pub fn new(
        id: String,
        name: impl Into<String>,
        description: Option<String>,
        environments: Vec<Environment>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description,
            changes: Vec::new(),
            environments,
            status: ChangeSetStatus::Draft,
            created_at: now,
            updated_at: now,
            applied_at: None,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.status == ChangeSetStatus::Draft
    }

    pub fn change(&self, change_id: &str) -> Option<&Change> {
        self.changes.iter().find(|c| c.id == change_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The live value no longer matches what the change set staged
    ConcurrentEdit,
    /// The staged variable is gone, or a staged delete still finds it
    MissingVariable,
}

/// Divergence between a change set and the live variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub var_id: String,
    pub var_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(rename = "conflictType")]
    pub kind: ConflictKind,
    pub details: String,
}
