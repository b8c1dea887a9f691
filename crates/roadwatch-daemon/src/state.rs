//! Shared handler state.

use roadwatch_core::repair::RepairEngine;
use roadwatch_core::store::SqliteStore;

/// State shared by every API handler.
///
/// Cloning is cheap: the store shares one connection behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AppState {
    store: SqliteStore,
    engine: RepairEngine<SqliteStore>,
    list_limit: u32,
}

impl AppState {
    /// Creates handler state over `store`, capping listings at `list_limit`
    /// rows.
    #[must_use]
    pub fn new(store: SqliteStore, list_limit: u32) -> Self {
        Self {
            engine: RepairEngine::new(store.clone()),
            store,
            list_limit,
        }
    }

    /// Hazard and worker storage.
    #[must_use]
    pub const fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Repair Status Engine over the same store.
    #[must_use]
    pub const fn engine(&self) -> &RepairEngine<SqliteStore> {
        &self.engine
    }

    /// Row cap for the listing endpoints.
    #[must_use]
    pub const fn list_limit(&self) -> u32 {
        self.list_limit
    }
}
