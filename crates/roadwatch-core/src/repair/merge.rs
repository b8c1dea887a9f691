//! Repair tracker records and the forward-only merge.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hazard::HazardId;

/// A repair workflow milestone.
///
/// Variants are declared in workflow order, so `Ord` follows the order in
/// which a crew normally progresses through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    /// Hazard reported.
    Reported,
    /// A crew has been assigned.
    TeamAssigned,
    /// The crew is travelling to the site.
    OnTheWay,
    /// Repair work has started.
    InProgress,
    /// Repair finished.
    Completed,
}

impl Milestone {
    /// All milestones in workflow order.
    pub const ALL: [Self; 5] = [
        Self::Reported,
        Self::TeamAssigned,
        Self::OnTheWay,
        Self::InProgress,
        Self::Completed,
    ];

    /// Field name used on the wire and in the store.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Reported => "reported_at",
            Self::TeamAssigned => "team_assigned_at",
            Self::OnTheWay => "on_the_way_at",
            Self::InProgress => "in_progress_at",
            Self::Completed => "completed_at",
        }
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Per-hazard repair workflow record.
///
/// # Invariant
///
/// A milestone timestamp, once set, never changes for the lifetime of the
/// record. Only [`merge`] (or a store's conditional write with the same
/// semantics) may produce a successor record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairTracker {
    /// Identifier of the tracked hazard.
    pub id: HazardId,
    /// Assigned worker. Freely overwritable.
    #[serde(default)]
    pub worker: Option<String>,
    /// When the hazard was reported.
    #[serde(default)]
    pub reported_at: Option<DateTime<Utc>>,
    /// When a team was assigned.
    #[serde(default)]
    pub team_assigned_at: Option<DateTime<Utc>>,
    /// When the team set off.
    #[serde(default)]
    pub on_the_way_at: Option<DateTime<Utc>>,
    /// When work started.
    #[serde(default)]
    pub in_progress_at: Option<DateTime<Utc>>,
    /// When work finished.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RepairTracker {
    /// Creates a tracker with no worker and no milestones.
    #[must_use]
    pub const fn new(id: HazardId) -> Self {
        Self {
            id,
            worker: None,
            reported_at: None,
            team_assigned_at: None,
            on_the_way_at: None,
            in_progress_at: None,
            completed_at: None,
        }
    }

    /// Returns the recorded timestamp of `milestone`, if any.
    #[must_use]
    pub const fn milestone(&self, milestone: Milestone) -> Option<DateTime<Utc>> {
        match milestone {
            Milestone::Reported => self.reported_at,
            Milestone::TeamAssigned => self.team_assigned_at,
            Milestone::OnTheWay => self.on_the_way_at,
            Milestone::InProgress => self.in_progress_at,
            Milestone::Completed => self.completed_at,
        }
    }

    const fn milestone_mut(&mut self, milestone: Milestone) -> &mut Option<DateTime<Utc>> {
        match milestone {
            Milestone::Reported => &mut self.reported_at,
            Milestone::TeamAssigned => &mut self.team_assigned_at,
            Milestone::OnTheWay => &mut self.on_the_way_at,
            Milestone::InProgress => &mut self.in_progress_at,
            Milestone::Completed => &mut self.completed_at,
        }
    }

    /// Latest milestone in workflow order that has been recorded.
    #[must_use]
    pub fn stage(&self) -> Option<Milestone> {
        Milestone::ALL
            .into_iter()
            .rev()
            .find(|m| self.milestone(*m).is_some())
    }
}

/// A partial update to a [`RepairTracker`].
///
/// Every field is optional. A key missing from the JSON body and a key
/// explicitly set to `null` both decode to `None`, which means "leave the
/// stored value alone". Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairUpdate {
    /// New worker assignment.
    #[serde(default)]
    pub worker: Option<String>,
    /// Report time, if not yet recorded.
    #[serde(default)]
    pub reported_at: Option<DateTime<Utc>>,
    /// Team assignment time, if not yet recorded.
    #[serde(default)]
    pub team_assigned_at: Option<DateTime<Utc>>,
    /// Departure time, if not yet recorded.
    #[serde(default)]
    pub on_the_way_at: Option<DateTime<Utc>>,
    /// Work start time, if not yet recorded.
    #[serde(default)]
    pub in_progress_at: Option<DateTime<Utc>>,
    /// Completion time, if not yet recorded.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RepairUpdate {
    /// Returns the supplied timestamp for `milestone`, if any.
    #[must_use]
    pub const fn milestone(&self, milestone: Milestone) -> Option<DateTime<Utc>> {
        match milestone {
            Milestone::Reported => self.reported_at,
            Milestone::TeamAssigned => self.team_assigned_at,
            Milestone::OnTheWay => self.on_the_way_at,
            Milestone::InProgress => self.in_progress_at,
            Milestone::Completed => self.completed_at,
        }
    }

    /// Sets `milestone` (builder pattern).
    #[must_use]
    pub const fn with_milestone(mut self, milestone: Milestone, at: DateTime<Utc>) -> Self {
        match milestone {
            Milestone::Reported => self.reported_at = Some(at),
            Milestone::TeamAssigned => self.team_assigned_at = Some(at),
            Milestone::OnTheWay => self.on_the_way_at = Some(at),
            Milestone::InProgress => self.in_progress_at = Some(at),
            Milestone::Completed => self.completed_at = Some(at),
        }
        self
    }

    /// Sets the worker (builder pattern).
    #[must_use]
    pub fn with_worker(mut self, worker: impl Into<String>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Returns true if the update carries no field at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.worker.is_none() && Milestone::ALL.iter().all(|m| self.milestone(*m).is_none())
    }

    /// Milestones this update tried to change but that `merged` already held
    /// with a different value.
    ///
    /// These attempted overwrites are absorbed by the merge, never reported
    /// as errors.
    #[must_use]
    pub fn absorbed_by(&self, merged: &RepairTracker) -> Vec<Milestone> {
        Milestone::ALL
            .into_iter()
            .filter(|m| match (self.milestone(*m), merged.milestone(*m)) {
                (Some(incoming), Some(stored)) => incoming != stored,
                _ => false,
            })
            .collect()
    }
}

/// Merges `update` into `existing` using forward-only semantics.
///
/// - Milestones: the existing value if set, else the incoming value if
///   supplied, else unset.
/// - `worker`: the incoming value if supplied, else the existing value.
///
/// The merge is idempotent and, for milestones already set, independent of
/// the number and order of updates applied.
#[must_use]
pub fn merge(existing: &RepairTracker, update: &RepairUpdate) -> RepairTracker {
    let mut merged = existing.clone();
    merged.worker = update.worker.clone().or_else(|| existing.worker.clone());
    for milestone in Milestone::ALL {
        let slot = merged.milestone_mut(milestone);
        if slot.is_none() {
            *slot = update.milestone(milestone);
        }
    }
    merged
}
