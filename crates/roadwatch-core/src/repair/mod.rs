//! Repair Status Engine.
//!
//! Repair trackers record when each step of a hazard's repair workflow
//! happened. Updates arrive as partial payloads from field crews, possibly
//! repeated and out of order, and are folded into the stored record with a
//! forward-only merge:
//!
//! - **Milestones are write-once**: `reported_at`, `team_assigned_at`,
//!   `on_the_way_at`, `in_progress_at` and `completed_at` keep their first
//!   recorded value forever
//! - **Worker is overwritable**: the last supplied worker wins
//! - **Idempotent**: re-applying the same payload is a no-op
//! - **Missing means unchanged**: an omitted field and an explicit `null`
//!   both leave the stored value alone
//!
//! An update for a hazard with no tracker fails with
//! [`RepairError::NotFound`], distinct from store failures.
//!
//! # Example
//!
//! ```rust,ignore
//! use roadwatch_core::repair::{Milestone, RepairEngine, RepairUpdate};
//! use roadwatch_core::store::InMemoryStore;
//!
//! let engine = RepairEngine::new(InMemoryStore::new());
//! let update = RepairUpdate::default().with_milestone(Milestone::TeamAssigned, now);
//! let tracker = engine.apply_update(&"5".into(), update).await?;
//! ```

mod engine;
mod merge;

#[cfg(test)]
mod tests;

pub use engine::{RepairEngine, RepairError, RepairStore};
pub use merge::{Milestone, RepairTracker, RepairUpdate, merge};
