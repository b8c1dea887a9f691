//! Marker registry for looking up rendered hazard markers.
//!
//! This module provides the [`MarkerRegistry`], an identity-lookup table from
//! [`HazardId`] to the transient rendering handle of that hazard's marker.
//! The registry is scoped to one map view and is rebuilt whenever the
//! rendered hazard set is refreshed; it is never process-global.
//!
//! # Usage
//!
//! ```rust,ignore
//! use roadwatch_core::registry::MarkerRegistry;
//!
//! let mut registry = MarkerRegistry::new();
//! assert!(registry.register("5".into(), first_handle));
//! assert!(!registry.register("5".into(), second_handle)); // ignored
//!
//! let handle = registry.lookup(&"5".into()).unwrap(); // first_handle
//! registry.rebuild();
//! assert!(registry.lookup(&"5".into()).is_none());
//! ```

use std::collections::HashMap;

use tracing::trace;

use crate::hazard::HazardId;

/// The rendering-side handle of a hazard marker.
///
/// Handles are back references into whatever draws the map. They must not
/// own hazard data: dropping the registry (or rebuilding it) releases every
/// handle without touching the hazard set.
pub trait MarkerHandle {
    /// Opens the marker's popup.
    fn open_popup(&self);

    /// Returns the rendered height of the popup in pixels.
    ///
    /// Returns `None` while the popup has no rendered element (not opened
    /// yet, or its content has not materialized).
    fn popup_height(&self) -> Option<f64>;
}

/// Registry of marker handles keyed by hazard id.
///
/// # Registration Semantics
///
/// The first registration for an id wins. Later registrations for the same
/// id are ignored until the registry is explicitly rebuilt. Renderers may
/// re-announce a marker on every render pass; only the handle seen first is
/// retained.
///
/// # Thread Safety
///
/// The registry is not internally synchronized. It is written by the
/// rendering path and read by the focus controller on the same logical
/// thread.
#[derive(Debug)]
pub struct MarkerRegistry<H> {
    /// Registered handles by hazard id.
    handles: HashMap<HazardId, H>,
    /// Incremented on every rebuild.
    generation: u64,
}

impl<H> Default for MarkerRegistry<H> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
            generation: 0,
        }
    }
}

impl<H> MarkerRegistry<H> {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a marker handle.
    ///
    /// # Returns
    ///
    /// `true` if the handle was retained, `false` if a handle for `id` was
    /// already registered (the new handle is dropped).
    pub fn register(&mut self, id: HazardId, handle: H) -> bool {
        if self.handles.contains_key(&id) {
            trace!(hazard_id = %id, "marker already registered, keeping first handle");
            return false;
        }
        self.handles.insert(id, handle);
        true
    }

    /// Look up the handle registered for `id`.
    #[must_use]
    pub fn lookup(&self, id: &HazardId) -> Option<&H> {
        self.handles.get(id)
    }

    /// Check if a handle is registered for `id`.
    #[must_use]
    pub fn contains(&self, id: &HazardId) -> bool {
        self.handles.contains_key(id)
    }

    /// Drop every handle so the next render can register fresh ones.
    pub fn rebuild(&mut self) {
        self.handles.clear();
        self.generation += 1;
    }

    /// Number of rebuilds since creation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the number of registered handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if no handles are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Returns an iterator over registered hazard ids.
    pub fn ids(&self) -> impl Iterator<Item = &HazardId> + '_ {
        self.handles.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_new_empty() {
        let registry: MarkerRegistry<&str> = MarkerRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.generation(), 0);
    }

    #[test]
    fn test_registry_register_and_lookup() {
        let mut registry = MarkerRegistry::new();

        assert!(registry.register(HazardId::from("5"), "marker-5"));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&HazardId::from("5")));
        assert_eq!(registry.lookup(&HazardId::from("5")), Some(&"marker-5"));
    }

    #[test]
    fn test_registry_lookup_nonexistent() {
        let registry: MarkerRegistry<&str> = MarkerRegistry::new();
        assert!(registry.lookup(&HazardId::from("missing")).is_none());
    }

    #[test]
    fn test_registry_first_registration_wins() {
        let mut registry = MarkerRegistry::new();

        assert!(registry.register(HazardId::from("5"), "A"));
        assert!(!registry.register(HazardId::from("5"), "B"));

        assert_eq!(registry.lookup(&HazardId::from("5")), Some(&"A"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_rebuild_accepts_new_handles() {
        let mut registry = MarkerRegistry::new();
        registry.register(HazardId::from("5"), "A");

        registry.rebuild();
        assert!(registry.is_empty());
        assert_eq!(registry.generation(), 1);

        assert!(registry.register(HazardId::from("5"), "B"));
        assert_eq!(registry.lookup(&HazardId::from("5")), Some(&"B"));
    }

    #[test]
    fn test_registry_ids() {
        let mut registry = MarkerRegistry::new();
        registry.register(HazardId::from("1"), ());
        registry.register(HazardId::from("2"), ());

        let mut ids: Vec<_> = registry.ids().map(HazardId::as_str).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
