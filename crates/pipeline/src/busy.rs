//! Tracking of in-flight long-running operations.
//!
//! Every operation registers a description when it starts and receives a
//! [`BusyGuard`]. Dropping the guard removes the entry, so the tracker is
//! emptied on success, error, cancellation and panic alike.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

/// Shared registry of running operations. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct BusyTracker {
    ops: Arc<Mutex<HashMap<Uuid, String>>>,
}

impl BusyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an operation until the returned guard is dropped.
    pub fn begin(&self, description: impl Into<String>) -> BusyGuard {
        let id = Uuid::new_v4();
        let description = description.into();
        tracing::debug!(op = %id, %description, "operation started");
        self.lock().insert(id, description);
        BusyGuard {
            id,
            ops: Arc::clone(&self.ops),
        }
    }

    pub fn is_busy(&self) -> bool {
        !self.lock().is_empty()
    }

    /// Descriptions of the running operations, sorted for stable output.
    pub fn descriptions(&self) -> Vec<String> {
        let mut out: Vec<String> = self.lock().values().cloned().collect();
        out.sort();
        out
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, String>> {
        self.ops.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Removes its operation from the tracker on drop.
#[derive(Debug)]
pub struct BusyGuard {
    id: Uuid,
    ops: Arc<Mutex<HashMap<Uuid, String>>>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let mut ops = self.ops.lock().unwrap_or_else(|e| e.into_inner());
        if ops.remove(&self.id).is_some() {
            tracing::debug!(op = %self.id, "operation finished");
        }
    }
}
