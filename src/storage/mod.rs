use std::collections::HashMap;
use std::sync::Mutex;

/// Scoped keys the core uses against the host key-value store.
pub mod keys {
    pub const SCAN_HISTORY: &str = "labelscan.scans";
    pub const DAILY_SCANS_USED: &str = "labelscan.daily_scans_used";
    pub const LAST_RESET_DATE: &str = "labelscan.last_reset_date";
    pub const SCAN_CREDITS: &str = "labelscan.scan_credits";
    pub const PREMIUM_CACHED: &str = "labelscan.premium_cached";
}

/// Storage abstraction over the host platform's persistent key-value store.
/// Values are plain strings; structured records are stored as JSON.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("value serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Mutex-guarded map store used by the test suites and demos.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().expect("store mutex poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        entries.remove(key);
        Ok(())
    }
}
