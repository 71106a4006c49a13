use std::sync::Arc;

use tracing::warn;

use crate::storage::{keys, KeyValueStore, StoreError};

use super::domain::{ScanId, ScanResult};

/// Persisted scan collection, newest first.
///
/// The whole history is stored as one JSON list under a scoped key. History
/// is recoverable display data: a corrupt stored value is reset to the empty
/// list with a warning rather than propagated.
pub struct ScanHistory<S> {
    store: Arc<S>,
}

impl<S: KeyValueStore> ScanHistory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<Vec<ScanResult>, StoreError> {
        let Some(raw) = self.store.get(keys::SCAN_HISTORY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(scans) => Ok(scans),
            Err(err) => {
                warn!(%err, "stored scan history unreadable, resetting");
                self.store.remove(keys::SCAN_HISTORY)?;
                Ok(Vec::new())
            }
        }
    }

    /// Prepend a completed scan so the most recent one lists first.
    pub fn add(&self, scan: ScanResult) -> Result<(), StoreError> {
        let mut scans = self.load()?;
        scans.insert(0, scan);
        self.save(&scans)
    }

    /// Remove a scan; returns whether a record was deleted.
    pub fn delete(&self, id: &ScanId) -> Result<bool, StoreError> {
        let mut scans = self.load()?;
        let before = scans.len();
        scans.retain(|scan| &scan.id != id);
        if scans.len() == before {
            return Ok(false);
        }
        self.save(&scans)?;
        Ok(true)
    }

    /// Flip the favorite flag; returns whether a record was updated. The only
    /// field-level mutation a stored scan supports.
    pub fn toggle_favorite(&self, id: &ScanId) -> Result<bool, StoreError> {
        let mut scans = self.load()?;
        let Some(scan) = scans.iter_mut().find(|scan| &scan.id == id) else {
            return Ok(false);
        };
        scan.is_favorite = !scan.is_favorite;
        self.save(&scans)?;
        Ok(true)
    }

    pub fn get(&self, id: &ScanId) -> Result<Option<ScanResult>, StoreError> {
        Ok(self.load()?.into_iter().find(|scan| &scan.id == id))
    }

    fn save(&self, scans: &[ScanResult]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(scans)?;
        self.store.set(keys::SCAN_HISTORY, &raw)
    }
}
