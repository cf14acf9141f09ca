//! Locating and loading `envledger.toml`.

use crate::storage::{StorageBackend, StorageRegistry};
use crate::{EnvLedger, EnvLedgerError, LedgerConfig, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "envledger.toml";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "envledger").ok_or(EnvLedgerError::NoConfigDir)
}

/// Path of the per-user configuration file, whether or not it exists.
pub fn get_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

/// Find the configuration file to use.
///
/// An explicit path always wins and is returned even if it does not exist,
/// so that loading it reports the error. Otherwise `envledger.toml` in `cwd`
/// is tried, then the user configuration file.
pub fn find_config(explicit: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = cwd.join(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    get_config_path().ok().filter(|path| path.is_file())
}

/// Load the configuration, falling back to defaults when no file is found.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<LedgerConfig> {
    match find_config(explicit, cwd) {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            Ok(LedgerConfig::try_from(path.as_path())?)
        }
        None => Ok(LedgerConfig::default()),
    }
}

/// The configured storage URI, or a file store in the user data directory.
pub fn resolve_storage_uri(config: &LedgerConfig) -> Result<String> {
    match &config.storage.uri {
        Some(uri) => Ok(uri.clone()),
        None => Ok(format!("file:{}", project_dirs()?.data_dir().display())),
    }
}

pub fn open_backend(config: &LedgerConfig) -> Result<Arc<dyn StorageBackend>> {
    let uri = resolve_storage_uri(config)?;
    debug!(uri = %uri, "opening storage");
    StorageRegistry::create_from_string(&uri)
}

/// Open a ledger with the storage and change-set defaults from `config`.
pub fn open_ledger(config: &LedgerConfig) -> Result<EnvLedger> {
    let backend = open_backend(config)?;
    Ok(EnvLedger::open(backend).with_default_environments(config.change_sets.environments.clone()))
}
