//! roadwatch-daemon - HTTP API for road hazards and repair workflow.
//!
//! The daemon serves the hazard listings the map consumes and accepts
//! repair tracker updates from field crews. Updates go through the
//! [`RepairEngine`](roadwatch_core::repair::RepairEngine) over a
//! [`SqliteStore`](roadwatch_core::store::SqliteStore), whose conditional
//! write keeps recorded milestones immutable even under concurrent updates.
//!
//! # Modules
//!
//! - [`api`]: axum router, handlers and the JSON error type
//! - [`state`]: shared handler state

pub mod api;
pub mod state;
