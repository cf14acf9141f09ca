//! # envledger core
//!
//! This crate provides the data model shared by every envledger component:
//! environment variables scoped across the three deployment environments, the
//! change records staged into change sets, audit history entries, and the
//! persisted UI state (filters and selection).
//!
//! Everything here is plain serde data. Persistence, id generation and the
//! consistency rules between the pieces live in the `envledger` crate.
//!
//! ## Key Features
//!
//! - **Fixed environments**: `development`, `preview` and `production`, in that canonical order
//! - **Explicit update commands**: `VariableUpdate` lists exactly which fields may change
//! - **Diff records**: `ChangeDraft` derives create/update/delete diffs from two variable states
//! - **Configuration**: `envledger.toml` parsing with validation
//!
//! ## Configuration Structure
//!
//! ```toml
//! [storage]
//! uri = "file:.envledger"
//!
//! [change_sets]
//! environments = ["development"]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod change;
mod config;
mod filter;
mod history;
mod variable;

pub use change::{
    Change, ChangeAction, ChangeDraft, ChangeSet, ChangeSetStatus, Conflict, ConflictKind,
    FieldChange, MetadataChanges, ValueChange,
};
pub use config::{ChangeSetDefaults, LedgerConfig, ParseError, StorageConfig};
pub use filter::{FilterState, SelectionState, SortBy, SortOrder};
pub use history::{CommitSummary, HistoryAction, HistoryEntry};
pub use variable::{
    EnvValues, EnvironmentVariable, NewVariable, TransferKind, TransferOperation,
    VariableUpdate, validate_environment_values, validate_variable_name,
};

/// One of the three fixed deployment contexts a variable's value may differ across.
///
/// The declaration order is the canonical display order, which is also the
/// `Ord` order used by every map keyed on environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Preview,
    Production,
}

impl Environment {
    /// All environments in canonical order.
    pub const ALL: [Environment; 3] = [
        Environment::Development,
        Environment::Preview,
        Environment::Production,
    ];

    /// Get all environments as an owned list.
    pub fn all() -> Vec<Environment> {
        Self::ALL.to_vec()
    }

    /// The canonical lowercase name used in storage and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Preview => "preview",
            Environment::Production => "production",
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Environment::Development => "Development",
            Environment::Preview => "Preview",
            Environment::Production => "Production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "preview" => Ok(Environment::Preview),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("Unknown environment: {}", other)),
        }
    }
}

impl<'a> TryFrom<&'a str> for Environment {
    type Error = String;

    fn try_from(s: &'a str) -> Result<Self, Self::Error> {
        s.parse()
    }
}
