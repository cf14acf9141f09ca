use crate::Environment;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

/// The `envledger.toml` configuration.
///
/// Both sections are optional; a missing file and an empty file mean the same thing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub change_sets: ChangeSetDefaults,
}

/// Where persisted state lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage URI such as `memory` or `file:/path/to/dir`. When unset the
    /// caller picks a platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Defaults applied to newly created change sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSetDefaults {
    #[serde(default = "default_change_set_environments")]
    pub environments: Vec<Environment>,
}

impl Default for ChangeSetDefaults {
    fn default() -> Self {
        Self {
            environments: default_change_set_environments(),
        }
    }
}

fn default_change_set_environments() -> Vec<Environment> {
    vec![Environment::Development]
}

impl LedgerConfig {
    /// Validate the configuration.
    ///
    /// Ensures that:
    /// - The storage URI, when given, is not blank
    /// - Change-set default environments are listed at most once each
    pub fn validate(&self) -> Result<(), ParseError> {
        if let Some(uri) = &self.storage.uri {
            if uri.trim().is_empty() {
                return Err(ParseError::Validation("storage.uri cannot be empty".into()));
            }
        }

        let envs = &self.change_sets.environments;
        for (i, env) in envs.iter().enumerate() {
            if envs[..i].contains(env) {
                return Err(ParseError::Validation(format!(
                    "change_sets.environments lists '{}' more than once",
                    env
                )));
            }
        }

        Ok(())
    }
}

impl FromStr for LedgerConfig {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: LedgerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl TryFrom<&Path> for LedgerConfig {
    type Error = ParseError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let content = fs::read_to_string(path)?;
        content.parse()
    }
}

/// Errors that can occur when loading an `envledger.toml` file.
#[derive(Debug)]
pub enum ParseError {
    /// I/O error when reading the configuration file
    Io(io::Error),
    /// TOML parsing error
    Toml(toml::de::Error),
    /// Validation error
    Validation(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Io(e) => write!(f, "I/O error: {}", e),
            ParseError::Toml(e) => write!(f, "TOML parsing error: {}", e),
            ParseError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io(e) => Some(e),
            ParseError::Toml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        ParseError::Io(e)
    }
}

impl From<toml::de::Error> for ParseError {
    fn from(e: toml::de::Error) -> Self {
        ParseError::Toml(e)
    }
}
