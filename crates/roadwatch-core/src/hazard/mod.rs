//! Hazard data model.
//!
//! Hazards are read-only from the kernel's point of view: they are owned by
//! the external data store and only ever listed, looked up, and rendered.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a reported hazard.
///
/// Repair trackers share the identifier of the hazard they track (1:1).
/// Always serialized as a string; decodes from either a string or an
/// integer, since data stores commonly key hazards by integer row id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct HazardId(String);

impl HazardId {
    /// Creates a hazard id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HazardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for HazardId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HazardIdVisitor;

        impl Visitor<'_> for HazardIdVisitor {
            type Value = HazardId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a hazard id as a string or an integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<HazardId, E> {
                Ok(HazardId::from(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<HazardId, E> {
                Ok(HazardId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<HazardId, E> {
                Ok(HazardId::from(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<HazardId, E> {
                Ok(HazardId(v.to_string()))
            }
        }

        deserializer.deserialize_any(HazardIdVisitor)
    }
}

impl From<&str> for HazardId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for HazardId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i64> for HazardId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinates {
    /// Creates a coordinate pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A reported road defect with location and classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    /// Hazard identifier.
    pub id: HazardId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Classification, e.g. `pothole`.
    pub hazard_type: String,
    /// Risk classification as reported by the detector.
    pub risk_level: String,
    /// Suggested repair material.
    #[serde(default)]
    pub repair_material: Option<String>,
    /// Estimated material volume required.
    #[serde(default)]
    pub volume_material_required: Option<f64>,
    /// Estimated crew size required.
    #[serde(default)]
    pub manpower_required: Option<u32>,
    /// Photo of the hazard.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Workflow label shown on the statistics listing.
    #[serde(default)]
    pub state: Option<String>,
    /// When the hazard was reported.
    pub reported_at: DateTime<Utc>,
}

impl Hazard {
    /// Returns the hazard position.
    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Projects the hazard onto the statistics listing shape.
    #[must_use]
    pub fn summary(&self) -> HazardSummary {
        HazardSummary {
            id: self.id.clone(),
            reported_at: self.reported_at,
            image_url: self.image_url.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            hazard_type: self.hazard_type.clone(),
            state: self.state.clone(),
            risk_level: self.risk_level.clone(),
        }
    }
}

/// Statistics listing row (`GET /stats`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardSummary {
    /// Hazard identifier.
    pub id: HazardId,
    /// When the hazard was reported.
    pub reported_at: DateTime<Utc>,
    /// Photo of the hazard.
    pub image_url: Option<String>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Classification.
    pub hazard_type: String,
    /// Workflow label.
    pub state: Option<String>,
    /// Risk classification.
    pub risk_level: String,
}

/// A repair crew member that can be assigned to a tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    /// Worker identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}
