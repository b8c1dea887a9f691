//! In-memory store.
//!
//! Used by map hosts that receive their hazard set from elsewhere and by
//! tests. Repair updates go through the default read-merge-persist path of
//! [`RepairStore::apply_forward_only`], so [`StoreStats`] shows exactly one
//! read and one write per update.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::error::StoreError;
use crate::hazard::{Hazard, HazardId};
use crate::loader::{HazardSource, SourceError};
use crate::repair::{RepairStore, RepairTracker};

/// Default cap on the hazard list returned to map hosts.
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Read/write counters for an [`InMemoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Tracker reads served.
    pub reads: u64,
    /// Tracker writes applied.
    pub writes: u64,
}

/// Hazards and repair trackers held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    hazards: Mutex<Vec<Hazard>>,
    trackers: Mutex<HashMap<HazardId, RepairTracker>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the hazard set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store lock is poisoned.
    pub fn set_hazards(&self, hazards: Vec<Hazard>) -> Result<(), StoreError> {
        *self.hazards.lock().map_err(poisoned)? = hazards;
        Ok(())
    }

    /// Inserts `record`, replacing any tracker with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store lock is poisoned.
    pub fn insert_tracker(&self, record: RepairTracker) -> Result<(), StoreError> {
        self.trackers
            .lock()
            .map_err(poisoned)?
            .insert(record.id.clone(), record);
        Ok(())
    }

    /// Returns the tracker read/write counters.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            reads: self.reads.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl RepairStore for InMemoryStore {
    async fn fetch_tracker(&self, id: &HazardId) -> Result<Option<RepairTracker>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.trackers.lock().map_err(poisoned)?.get(id).cloned())
    }

    async fn persist_tracker(&self, record: &RepairTracker) -> Result<RepairTracker, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.trackers
            .lock()
            .map_err(poisoned)?
            .insert(record.id.clone(), record.clone());
        Ok(record.clone())
    }
}

#[async_trait]
impl HazardSource for InMemoryStore {
    async fn fetch_hazard_list(&self) -> Result<Vec<Hazard>, SourceError> {
        let mut hazards = self
            .hazards
            .lock()
            .map_err(|_| SourceError::Unavailable("in-memory store lock poisoned".to_string()))?
            .clone();
        hazards.sort_by(|a, b| b.reported_at.cmp(&a.reported_at));
        hazards.truncate(DEFAULT_LIST_LIMIT as usize);
        Ok(hazards)
    }
}
