//! Error types for envledger operations

use thiserror::Error;

// Internal use only
use envledger_core::ParseError;

/// The main error type for envledger operations
///
/// Only malformed input is reported through this type. Unknown ids are
/// no-ops or `None`, and persistence failures are logged by the store
/// adapter instead of being returned.
#[derive(Error, Debug)]
pub enum EnvLedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Import failed: {}", .0.join("; "))]
    Import(Vec<String>),
    #[error("Storage backend '{0}' not found")]
    StorageNotFound(String),
    #[error("Storage operation failed: {0}")]
    StorageOperationFailed(String),
    #[error("Could not determine a configuration directory")]
    NoConfigDir,
}

impl EnvLedgerError {
    /// The individual messages of a validation or import failure.
    pub fn messages(&self) -> Vec<String> {
        match self {
            EnvLedgerError::Validation(errors) | EnvLedgerError::Import(errors) => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// A type alias for `Result<T, EnvLedgerError>`
pub type Result<T> = std::result::Result<T, EnvLedgerError>;

impl From<ParseError> for EnvLedgerError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Io(io_err) => EnvLedgerError::Io(io_err),
            ParseError::Toml(toml_err) => EnvLedgerError::Toml(toml_err),
            ParseError::Validation(msg) => EnvLedgerError::InvalidConfig(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_joins_messages() {
        let err = EnvLedgerError::Validation(vec!["first".into(), "second".into()]);
        assert_eq!(err.to_string(), "Validation failed: first; second");
        assert_eq!(err.messages(), vec!["first", "second"]);
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: EnvLedgerError = ParseError::Validation("bad".into()).into();
        assert!(matches!(err, EnvLedgerError::InvalidConfig(msg) if msg == "bad"));
    }
}
