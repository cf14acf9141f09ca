//! Durable key-value storage.
//!
//! A `StorageBackend` is a flat string-to-string store, one entry per slice
//! of state. `PersistentStore` layers typed JSON values over a backend and
//! never lets a storage failure escape: reads fall back to the default and
//! failed writes keep the in-memory value.

use crate::{EnvLedgerError, Result};
use std::path::PathBuf;
use std::sync::Arc;

pub mod file;
pub mod memory;
pub mod store;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use store::PersistentStore;

pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    /// Returns the name of this backend for display purposes
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct StorageInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub examples: Vec<&'static str>,
}

impl StorageInfo {
    pub fn display_with_examples(&self) -> String {
        if self.examples.is_empty() {
            format!("{}: {}", self.name, self.description)
        } else {
            format!(
                "{}: {} (e.g., {})",
                self.name,
                self.description,
                self.examples.join(", ")
            )
        }
    }
}

pub struct StorageRegistry;

impl StorageRegistry {
    pub fn backends() -> Vec<StorageInfo> {
        vec![
            StorageInfo {
                name: "file",
                description: "One JSON file per key in a directory",
                examples: vec!["file:.envledger", "file:///var/lib/envledger"],
            },
            StorageInfo {
                name: "memory",
                description: "In-process only, lost on exit",
                examples: vec![],
            },
        ]
    }

    /// Build a backend from a storage URI.
    ///
    /// Accepts `memory`, `memory:`, `file:<path>` and `file://<path>`.
    pub fn create_from_string(s: &str) -> Result<Arc<dyn StorageBackend>> {
        let (scheme, rest) = match s.find(':') {
            Some(pos) => (&s[..pos], Some(&s[pos + 1..])),
            None => (s, None),
        };

        match scheme {
            "memory" => Ok(Arc::new(MemoryStorage::new())),
            "file" => {
                let path = rest.map(|r| r.strip_prefix("//").unwrap_or(r)).unwrap_or("");
                if path.is_empty() {
                    return Err(EnvLedgerError::StorageOperationFailed(format!(
                        "Storage URI '{}' needs a directory, e.g. file:.envledger",
                        s
                    )));
                }
                Ok(Arc::new(FileStorage::new(PathBuf::from(path))))
            }
            _ => Err(EnvLedgerError::StorageNotFound(scheme.to_string())),
        }
    }
}
