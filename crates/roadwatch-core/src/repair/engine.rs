//! Repair Status Engine and its storage port.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use super::merge::{RepairTracker, RepairUpdate, merge};
use crate::hazard::HazardId;
use crate::store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

/// Errors returned by [`RepairEngine`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RepairError {
    /// No tracker exists for the requested hazard.
    #[error("repair tracker not found: {id}")]
    NotFound {
        /// The hazard id that was looked up.
        id: HazardId,
    },

    /// The store failed while reading or writing the tracker.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RepairError {
    /// Returns true if this error is a missing tracker.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// =============================================================================
// RepairStore Trait (Async)
// =============================================================================

/// Storage port for repair trackers.
///
/// `persist_tracker` has plain overwrite semantics. The forward-only
/// guarantee is enforced above it, by [`merge`], or by a backend override
/// of [`apply_forward_only`](Self::apply_forward_only) with the same
/// semantics.
#[async_trait]
pub trait RepairStore: Send + Sync {
    /// Fetches the tracker for `id`, or `None` if there is none.
    async fn fetch_tracker(&self, id: &HazardId) -> Result<Option<RepairTracker>, StoreError>;

    /// Overwrites the stored tracker with `record` and returns what was
    /// stored.
    async fn persist_tracker(&self, record: &RepairTracker) -> Result<RepairTracker, StoreError>;

    /// Applies `update` to the tracker for `id` with forward-only semantics.
    ///
    /// Returns `None` if no tracker exists for `id`.
    ///
    /// The provided implementation is a read-merge-persist round trip: one
    /// read and one write. It is not atomic, so two concurrent calls for the
    /// same id can interleave and the later write wins. Backends that
    /// support a conditional write (set-if-currently-null) should override
    /// this method to close that window.
    async fn apply_forward_only(
        &self,
        id: &HazardId,
        update: &RepairUpdate,
    ) -> Result<Option<RepairTracker>, StoreError> {
        let Some(existing) = self.fetch_tracker(id).await? else {
            return Ok(None);
        };
        let merged = merge(&existing, update);
        self.persist_tracker(&merged).await.map(Some)
    }
}

#[async_trait]
impl<S: RepairStore + ?Sized> RepairStore for Arc<S> {
    async fn fetch_tracker(&self, id: &HazardId) -> Result<Option<RepairTracker>, StoreError> {
        (**self).fetch_tracker(id).await
    }

    async fn persist_tracker(&self, record: &RepairTracker) -> Result<RepairTracker, StoreError> {
        (**self).persist_tracker(record).await
    }

    async fn apply_forward_only(
        &self,
        id: &HazardId,
        update: &RepairUpdate,
    ) -> Result<Option<RepairTracker>, StoreError> {
        (**self).apply_forward_only(id, update).await
    }
}

// =============================================================================
// RepairEngine
// =============================================================================

/// Applies partial updates to repair trackers.
///
/// # Example
///
/// ```rust,ignore
/// let engine = RepairEngine::new(SqliteStore::open("roadwatch.db")?);
/// let tracker = engine
///     .apply_update(&"5".into(), RepairUpdate::default().with_worker("Alice"))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct RepairEngine<S> {
    store: S,
}

impl<S: RepairStore> RepairEngine<S> {
    /// Creates an engine over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the current tracker for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RepairError::NotFound`] if no tracker exists, or
    /// [`RepairError::Store`] if the store fails.
    pub async fn tracker(&self, id: &HazardId) -> Result<RepairTracker, RepairError> {
        self.store
            .fetch_tracker(id)
            .await?
            .ok_or_else(|| RepairError::NotFound { id: id.clone() })
    }

    /// Merges `update` into the tracker for `id`, persists it, and returns
    /// the merged record.
    ///
    /// Milestones already recorded are never changed. Attempts to change
    /// them are dropped silently (logged at `debug`).
    ///
    /// # Errors
    ///
    /// Returns [`RepairError::NotFound`] if no tracker exists, or
    /// [`RepairError::Store`] if the store fails.
    pub async fn apply_update(
        &self,
        id: &HazardId,
        update: RepairUpdate,
    ) -> Result<RepairTracker, RepairError> {
        let merged = self
            .store
            .apply_forward_only(id, &update)
            .await?
            .ok_or_else(|| RepairError::NotFound { id: id.clone() })?;

        let absorbed = update.absorbed_by(&merged);
        if !absorbed.is_empty() {
            debug!(
                hazard_id = %id,
                ?absorbed,
                "ignored update to milestones that were already recorded"
            );
        }
        info!(
            hazard_id = %id,
            stage = ?merged.stage(),
            worker = merged.worker.as_deref().unwrap_or("-"),
            "repair tracker updated"
        );
        Ok(merged)
    }
}
