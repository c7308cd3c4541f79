//! Per-unit operation locks
//!
//! Mutating operations on the same `{unit_type}:{name}:{tag}` run one at a
//! time; different keys proceed concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use stencil_core::types::UnitType;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lock key of one unit tag
pub fn operation_key(unit_type: UnitType, name: &str, tag: &str) -> String {
    format!("{}:{}:{}", unit_type.key(), name, tag)
}

/// Held for the duration of an operation
pub struct OperationGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl OperationGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[derive(Clone, Default)]
pub struct OperationLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl OperationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a unit tag
    pub async fn acquire(&self, unit_type: UnitType, name: &str, tag: &str) -> OperationGuard {
        let key = operation_key(unit_type, name, tag);
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            // Drop entries nobody holds or waits on
            map.retain(|k, m| k == &key || Arc::strong_count(m) > 1);
            map.entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        OperationGuard {
            key,
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of keys currently tracked
    pub fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}
