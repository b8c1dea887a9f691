//! `SQLite`-backed store for hazards, workers and repair trackers.
//!
//! The [`SqliteStore`] implements [`RepairStore`] with an atomic conditional
//! write: a forward-only update is a single `UPDATE ... RETURNING` statement
//! in which every milestone column is assigned `COALESCE(column, ?)`. There
//! is no read-modify-write window, so concurrent updates for the same
//! hazard cannot lose each other's milestones.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};
use tracing::debug;

use super::error::StoreError;
use crate::hazard::{Hazard, HazardId, HazardSummary, Worker};
use crate::repair::{RepairStore, RepairTracker, RepairUpdate};

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

const HAZARD_COLUMNS: &str = "id, latitude, longitude, hazard_type, risk_level, repair_material, \
     volume_material_required, manpower_required, image_url, state, reported_at";

const TRACKER_COLUMNS: &str =
    "id, worker, reported_at, team_assigned_at, on_the_way_at, in_progress_at, completed_at";

/// Hazard, worker and repair tracker storage backed by `SQLite`.
///
/// The connection is shared behind a mutex; every call holds it for the
/// duration of one statement (or one transaction).
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Opens or creates a store at the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        debug!(path = %path.display(), "opened sqlite store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Path of the database file, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection mutex poisoned".to_string()))
    }

    // =========================================================================
    // Hazards
    // =========================================================================

    /// Inserts or replaces a hazard.
    ///
    /// A newly reported hazard also gets its repair tracker, with
    /// `reported_at` recorded. An existing tracker is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be written.
    pub fn insert_hazard(&self, hazard: &Hazard) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT OR REPLACE INTO hazards ({HAZARD_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                hazard.id.as_str(),
                hazard.latitude,
                hazard.longitude,
                hazard.hazard_type,
                hazard.risk_level,
                hazard.repair_material,
                hazard.volume_material_required,
                hazard.manpower_required,
                hazard.image_url,
                hazard.state,
                hazard.reported_at,
            ],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO repair_trackers (id, reported_at) VALUES (?1, ?2)",
            params![hazard.id.as_str(), hazard.reported_at],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Lists hazards for map plotting, newest report first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_hazards(&self, limit: u32) -> Result<Vec<Hazard>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {HAZARD_COLUMNS} FROM hazards ORDER BY reported_at DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit], row_to_hazard)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Lists statistics rows, highest risk first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_summaries(&self, limit: u32) -> Result<Vec<HazardSummary>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {HAZARD_COLUMNS} FROM hazards ORDER BY risk_level DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit], |row| row_to_hazard(row).map(|h| h.summary()))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Looks up a single hazard.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn hazard(&self, id: &HazardId) -> Result<Option<Hazard>, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {HAZARD_COLUMNS} FROM hazards WHERE id = ?1"),
            params![id.as_str()],
            row_to_hazard,
        )
        .optional()
        .map_err(StoreError::from)
    }

    // =========================================================================
    // Workers
    // =========================================================================

    /// Inserts or renames a worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written.
    pub fn insert_worker(&self, worker: &Worker) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO workers (id, name) VALUES (?1, ?2)",
            params![worker.id, worker.name],
        )?;
        Ok(())
    }

    /// Lists the worker directory ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_workers(&self) -> Result<Vec<Worker>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM workers ORDER BY name, id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Worker {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    // =========================================================================
    // Repair trackers
    // =========================================================================

    /// Creates an empty tracker for `id` unless one already exists.
    ///
    /// Returns `true` if a tracker was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written.
    pub fn create_tracker(&self, id: &HazardId) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO repair_trackers (id) VALUES (?1)",
            params![id.as_str()],
        )?;
        Ok(inserted > 0)
    }

    fn fetch_tracker_sync(&self, id: &HazardId) -> Result<Option<RepairTracker>, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {TRACKER_COLUMNS} FROM repair_trackers WHERE id = ?1"),
            params![id.as_str()],
            row_to_tracker,
        )
        .optional()
        .map_err(StoreError::from)
    }

    fn persist_tracker_sync(&self, record: &RepairTracker) -> Result<RepairTracker, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "INSERT INTO repair_trackers ({TRACKER_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (id) DO UPDATE SET
                     worker = excluded.worker,
                     reported_at = excluded.reported_at,
                     team_assigned_at = excluded.team_assigned_at,
                     on_the_way_at = excluded.on_the_way_at,
                     in_progress_at = excluded.in_progress_at,
                     completed_at = excluded.completed_at
                 RETURNING {TRACKER_COLUMNS}"
            ),
            params![
                record.id.as_str(),
                record.worker,
                record.reported_at,
                record.team_assigned_at,
                record.on_the_way_at,
                record.in_progress_at,
                record.completed_at,
            ],
            row_to_tracker,
        )
        .map_err(StoreError::from)
    }

    fn apply_forward_only_sync(
        &self,
        id: &HazardId,
        update: &RepairUpdate,
    ) -> Result<Option<RepairTracker>, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "UPDATE repair_trackers SET
                     worker = COALESCE(?2, worker),
                     reported_at = COALESCE(reported_at, ?3),
                     team_assigned_at = COALESCE(team_assigned_at, ?4),
                     on_the_way_at = COALESCE(on_the_way_at, ?5),
                     in_progress_at = COALESCE(in_progress_at, ?6),
                     completed_at = COALESCE(completed_at, ?7)
                 WHERE id = ?1
                 RETURNING {TRACKER_COLUMNS}"
            ),
            params![
                id.as_str(),
                update.worker,
                update.reported_at,
                update.team_assigned_at,
                update.on_the_way_at,
                update.in_progress_at,
                update.completed_at,
            ],
            row_to_tracker,
        )
        .optional()
        .map_err(StoreError::from)
    }
}

#[async_trait]
impl RepairStore for SqliteStore {
    async fn fetch_tracker(&self, id: &HazardId) -> Result<Option<RepairTracker>, StoreError> {
        self.fetch_tracker_sync(id)
    }

    async fn persist_tracker(&self, record: &RepairTracker) -> Result<RepairTracker, StoreError> {
        self.persist_tracker_sync(record)
    }

    async fn apply_forward_only(
        &self,
        id: &HazardId,
        update: &RepairUpdate,
    ) -> Result<Option<RepairTracker>, StoreError> {
        self.apply_forward_only_sync(id, update)
    }
}

fn row_to_hazard(row: &Row<'_>) -> rusqlite::Result<Hazard> {
    Ok(Hazard {
        id: HazardId::new(row.get::<_, String>(0)?),
        latitude: row.get(1)?,
        longitude: row.get(2)?,
        hazard_type: row.get(3)?,
        risk_level: row.get(4)?,
        repair_material: row.get(5)?,
        volume_material_required: row.get(6)?,
        manpower_required: row.get(7)?,
        image_url: row.get(8)?,
        state: row.get(9)?,
        reported_at: row.get(10)?,
    })
}

fn row_to_tracker(row: &Row<'_>) -> rusqlite::Result<RepairTracker> {
    Ok(RepairTracker {
        id: HazardId::new(row.get::<_, String>(0)?),
        worker: row.get(1)?,
        reported_at: row.get(2)?,
        team_assigned_at: row.get(3)?,
        on_the_way_at: row.get(4)?,
        in_progress_at: row.get(5)?,
        completed_at: row.get(6)?,
    })
}
