#![allow(dead_code)]

use envledger::{
    EnvLedger, Environment, FileStorage, ManualClock, NewVariable, Notification, Notifier,
    StorageBackend,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Test helper owning a temporary file store
pub struct TestFixture {
    _temp_dir: TempDir,
    pub base_path: PathBuf,
    pub clock: ManualClock,
    pub notifications: Arc<RecordingNotifier>,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            base_path,
            clock: ManualClock::new(),
            notifications: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        Arc::new(FileStorage::new(self.base_path.clone()))
    }

    /// Open a ledger over the fixture's directory. Every call reloads from disk.
    pub fn ledger(&self) -> EnvLedger<ManualClock> {
        EnvLedger::with_clock(self.backend(), self.clock.clone())
            .with_notifier(self.notifications.clone())
    }

    /// A ledger seeded with the four standard variables.
    pub fn seeded_ledger(&self) -> EnvLedger<ManualClock> {
        let mut ledger = self.ledger();
        for data in fixture_variables() {
            ledger.create_variable(data).unwrap();
        }
        ledger
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.title.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.received.lock().unwrap().push(notification);
    }
}

pub fn fixture_variables() -> Vec<NewVariable> {
    vec![
        NewVariable::new("DATABASE_URL")
            .value(Environment::Development, "postgresql://localhost:5432/dev")
            .value(Environment::Production, "postgresql://db.internal:5432/prod")
            .secret(true)
            .description("Primary database connection"),
        NewVariable::new("API_KEY")
            .value(Environment::Development, "dev-api-key")
            .value(Environment::Preview, "preview-api-key")
            .value(Environment::Production, "prod-api-key")
            .secret(true),
        NewVariable::new("NODE_ENV")
            .value(Environment::Development, "development")
            .value(Environment::Production, "production"),
        NewVariable::new("DEBUG_MODE")
            .value(Environment::Development, "true")
            .description("Verbose logging"),
    ]
}

pub fn names(variables: &[envledger::EnvironmentVariable]) -> Vec<&str> {
    variables.iter().map(|v| v.name.as_str()).collect()
}
