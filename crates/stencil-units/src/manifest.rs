//! Local manifest of known units
//!
//! The manifest tracks, per unit type, every unit seen in the remote
//! catalog together with its per-tag install state. Each collection is one
//! JSON document in the key-value store:
//!
//! ```text
//! manifest.official      [{"name":"widget","unitType":"official","tags":[...]}]
//! manifest.organization  [...]
//! manifest.plugin        [...]
//! refreshed.official     "2026-03-01T10:00:00Z"
//! ```
//!
//! Reads never fail: a missing or corrupt document is an empty collection.

use crate::error::{UnitError, UnitResult};
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use stencil_core::types::{UnitRecord, UnitType};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// Store key of a unit type's collection
pub fn manifest_key(unit_type: UnitType) -> String {
    format!("manifest.{}", unit_type.key())
}

/// Store key of a unit type's last successful refresh
pub fn refreshed_key(unit_type: UnitType) -> String {
    format!("refreshed.{}", unit_type.key())
}

/// Manifest persistence with one async critical section per unit type
#[derive(Clone)]
pub struct ManifestStore {
    store: Arc<dyn KeyValueStore>,
    locks: Arc<HashMap<UnitType, Arc<Mutex<()>>>>,
}

impl ManifestStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let locks = UnitType::ALL
            .iter()
            .map(|unit_type| (*unit_type, Arc::new(Mutex::new(()))))
            .collect();
        Self {
            store,
            locks: Arc::new(locks),
        }
    }

    /// Read a collection; corrupt or unreadable documents yield an empty list
    pub fn read(&self, unit_type: UnitType) -> Vec<UnitRecord> {
        let key = manifest_key(unit_type);
        let content = match self.store.get(&key) {
            Ok(Some(content)) => content,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read manifest {}: {}", key, e);
                return Vec::new();
            }
        };

        let records: Vec<UnitRecord> = match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!("Ignoring corrupt manifest {}: {}", key, e);
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(records.len());
        for record in records {
            if record.unit_type != unit_type {
                warn!(
                    "Dropping {} from {}: recorded as {}",
                    record.name, key, record.unit_type
                );
                continue;
            }
            if !seen.insert(record.name.clone()) {
                warn!("Dropping duplicate {} from {}", record.name, key);
                continue;
            }
            unique.push(record);
        }

        debug!("Loaded {} units from {}", unique.len(), key);
        unique
    }

    /// Replace a collection
    pub fn write(&self, unit_type: UnitType, records: &[UnitRecord]) -> UnitResult<()> {
        let key = manifest_key(unit_type);
        let content =
            serde_json::to_string(records).map_err(|e| UnitError::store(key.as_str(), e))?;
        self.store.set(&key, &content)?;
        debug!("Saved {} units to {}", records.len(), key);
        Ok(())
    }

    /// Every collection, keyed by unit type
    pub fn read_all(&self) -> BTreeMap<UnitType, Vec<UnitRecord>> {
        UnitType::ALL
            .iter()
            .map(|unit_type| (*unit_type, self.read(*unit_type)))
            .collect()
    }

    /// Enter the unit type's critical section. Not reentrant.
    pub async fn lock(&self, unit_type: UnitType) -> OwnedMutexGuard<()> {
        // Every UnitType is seeded in `new`
        let mutex = self
            .locks
            .get(&unit_type)
            .cloned()
            .unwrap_or_else(|| Arc::new(Mutex::new(())));
        mutex.lock_owned().await
    }

    /// Read-modify-write a collection under its lock.
    ///
    /// Nothing is written when `f` fails.
    pub async fn update<F, R>(&self, unit_type: UnitType, f: F) -> UnitResult<R>
    where
        F: FnOnce(&mut Vec<UnitRecord>) -> UnitResult<R>,
    {
        let _guard = self.lock(unit_type).await;
        let mut records = self.read(unit_type);
        let result = f(&mut records)?;
        self.write(unit_type, &records)?;
        Ok(result)
    }

    /// When the unit type's catalog was last refreshed successfully
    pub fn last_refreshed(&self, unit_type: UnitType) -> Option<DateTime<Utc>> {
        let key = refreshed_key(unit_type);
        let content = match self.store.get(&key) {
            Ok(content) => content?,
            Err(e) => {
                warn!("Failed to read {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str::<DateTime<Utc>>(&content) {
            Ok(at) => Some(at),
            Err(e) => {
                warn!("Ignoring corrupt timestamp {}: {}", key, e);
                None
            }
        }
    }

    pub fn mark_refreshed(&self, unit_type: UnitType, at: DateTime<Utc>) -> UnitResult<()> {
        let key = refreshed_key(unit_type);
        let content = serde_json::to_string(&at).map_err(|e| UnitError::store(key.as_str(), e))?;
        self.store.set(&key, &content)
    }
}
