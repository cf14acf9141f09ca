use super::StorageBackend;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, error};

/// A typed value persisted under one key.
///
/// Reads fall back to the default on missing or malformed data. Writes
/// update the in-memory value first and only log when the backend refuses
/// them, so the running session keeps working on an unusable store.
pub struct PersistentStore<T> {
    backend: Arc<dyn StorageBackend>,
    key: String,
    default: T,
    value: T,
}

impl<T> PersistentStore<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn open(backend: Arc<dyn StorageBackend>, key: impl Into<String>, default: T) -> Self {
        let key = key.into();
        let value = Self::read(backend.as_ref(), &key, &default);
        Self {
            backend,
            key,
            default,
            value,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replace the value and persist it.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.persist();
    }

    /// Mutate the value in place and persist the result.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.value);
        self.persist();
        result
    }

    /// Reset to the default and drop the stored entry.
    pub fn clear(&mut self) {
        self.value = self.default.clone();
        if let Err(e) = self.backend.remove(&self.key) {
            error!(key = %self.key, error = %e, "failed to clear stored value");
        }
    }

    /// Re-read the stored value, discarding in-memory state.
    pub fn reload(&mut self) {
        self.value = Self::read(self.backend.as_ref(), &self.key, &self.default);
    }

    fn read(backend: &dyn StorageBackend, key: &str, default: &T) -> T {
        match backend.get(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    error!(key, error = %e, "stored value is malformed, using default");
                    default.clone()
                }
            },
            Ok(None) => default.clone(),
            Err(e) => {
                error!(key, error = %e, "failed to read stored value, using default");
                default.clone()
            }
        }
    }

    fn persist(&self) {
        let raw = match serde_json::to_string(&self.value) {
            Ok(raw) => raw,
            Err(e) => {
                error!(key = %self.key, error = %e, "failed to serialize value");
                return;
            }
        };
        match self.backend.set(&self.key, &raw) {
            Ok(()) => debug!(key = %self.key, bytes = raw.len(), "persisted"),
            Err(e) => error!(key = %self.key, error = %e, "failed to persist value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Complex {
        name: String,
        items: Vec<u32>,
        nested: Nested,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Nested {
        value: bool,
    }

    fn memory() -> Arc<MemoryStorage> {
        Arc::new(MemoryStorage::new())
    }

    #[test]
    fn test_default_when_empty() {
        let store = PersistentStore::open(memory(), "test-key", "default-value".to_string());
        assert_eq!(store.get(), "default-value");
    }

    #[test]
    fn test_reads_existing_value() {
        let backend = memory();
        backend.set("test-key", "\"stored-value\"").unwrap();
        let store = PersistentStore::open(backend, "test-key", "default-value".to_string());
        assert_eq!(store.get(), "stored-value");
    }

    #[test]
    fn test_set_persists() {
        let backend = memory();
        let mut store = PersistentStore::open(backend.clone(), "test-key", "initial".to_string());
        store.set("updated-value".to_string());
        assert_eq!(store.get(), "updated-value");
        assert_eq!(
            backend.get("test-key").unwrap().as_deref(),
            Some("\"updated-value\"")
        );
    }

    #[test]
    fn test_update_in_place() {
        let backend = memory();
        let mut store = PersistentStore::open(backend.clone(), "counter", 10u32);
        let doubled = store.update(|v| {
            *v += 5;
            *v * 2
        });
        assert_eq!(doubled, 30);
        assert_eq!(*store.get(), 15);
        assert_eq!(backend.get("counter").unwrap().as_deref(), Some("15"));
    }

    #[test]
    fn test_clear_resets_and_removes() {
        let backend = memory();
        let mut store = PersistentStore::open(backend.clone(), "test-key", "initial".to_string());
        store.set("some-value".to_string());
        store.clear();
        assert_eq!(store.get(), "initial");
        assert!(!backend.contains("test-key"));
    }

    #[test]
    fn test_complex_values() {
        let backend = memory();
        let value = Complex {
            name: "test".into(),
            items: vec![1, 2, 3],
            nested: Nested { value: true },
        };
        let mut store = PersistentStore::open(backend.clone(), "complex-key", value.clone());
        store.set(value.clone());

        let reopened = PersistentStore::open(
            backend,
            "complex-key",
            Complex {
                name: String::new(),
                items: vec![],
                nested: Nested { value: false },
            },
        );
        assert_eq!(reopened.get(), &value);
    }

    #[test]
    fn test_write_failure_keeps_memory_value() {
        let backend = Arc::new(MemoryStorage::with_quota(4));
        let mut store = PersistentStore::open(backend.clone(), "error-key", "default".to_string());
        store.set("new-value".to_string());
        assert_eq!(store.get(), "new-value");
        assert!(!backend.contains("error-key"));
    }

    #[test]
    fn test_malformed_json_falls_back() {
        let backend = memory();
        backend.insert_raw("malformed-key", "invalid-json{").unwrap();
        let store = PersistentStore::open(backend, "malformed-key", "fallback".to_string());
        assert_eq!(store.get(), "fallback");
    }

    #[test]
    fn test_reload_discards_memory_state() {
        let backend = memory();
        let mut writer = PersistentStore::open(backend.clone(), "shared", Vec::<String>::new());
        let mut reader = PersistentStore::open(backend, "shared", Vec::<String>::new());
        writer.set(vec!["item1".into(), "item2".into()]);
        assert!(reader.get().is_empty());
        reader.reload();
        assert_eq!(reader.get(), &vec!["item1".to_string(), "item2".to_string()]);
    }
}
