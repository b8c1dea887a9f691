// Coordinates and pixel offsets are floating point; exact comparisons only
// happen in tests against values the code computed itself.
#![allow(clippy::float_cmp)]

//! roadwatch-core - road hazard mapping and repair workflow kernel.
//!
//! This crate holds the parts of roadwatch that carry real invariants:
//!
//! - [`repair`]: the Repair Status Engine. A forward-only merge over
//!   [`repair::RepairTracker`] records in which a milestone timestamp, once
//!   recorded, can never be overwritten.
//! - [`focus`]: the Map Focus Controller. A token-driven state machine that
//!   reconciles asynchronous viewport settle signals with popup measurement,
//!   guaranteeing that a newer focus request supersedes a stale one.
//! - [`registry`]: the Marker Registry, an identity lookup from hazard id to
//!   the transient rendering handle of its marker.
//! - [`loader`]: the hazard loading port with a retry-capable failure state.
//! - [`store`]: `SQLite` and in-memory implementations of the storage port.
//! - [`config`]: TOML configuration shared by the daemon and map hosts.
//!
//! # Runtime Requirements
//!
//! Everything here is single-threaded and cooperative. The async pieces
//! ([`focus::FocusDriver`], [`repair::RepairEngine`], [`loader::HazardLoader`])
//! run on any tokio runtime, including `current_thread`.

pub mod config;
pub mod focus;
pub mod hazard;
pub mod loader;
pub mod registry;
pub mod repair;
pub mod store;

pub use hazard::{Coordinates, Hazard, HazardId, HazardSummary, Worker};
