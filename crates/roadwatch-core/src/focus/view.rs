//! One map view: the rendered hazard set, its marker registry and its
//! focus controller.

use tracing::{debug, info};

use super::controller::{FocusConfig, FocusController, FocusState, FocusTarget, FrameOutcome, SettleOutcome};
use super::viewport::{FocusToken, SettleSubscription, Viewport};
use crate::hazard::{Hazard, HazardId};
use crate::loader::{HazardLoader, HazardSource, SourceError};
use crate::registry::{MarkerHandle, MarkerRegistry};

/// A map view over a [`Viewport`] with markers of handle type `H`.
///
/// The view owns its [`MarkerRegistry`]. Replacing the hazard set rebuilds
/// the registry, so handles from the previous render never resolve for the
/// new one.
#[derive(Debug)]
pub struct MapView<V, H> {
    controller: FocusController<V>,
    registry: MarkerRegistry<H>,
    hazards: Vec<Hazard>,
}

impl<V: Viewport, H: MarkerHandle> MapView<V, H> {
    /// Creates an empty view.
    #[must_use]
    pub fn new(viewport: V, config: FocusConfig) -> Self {
        Self {
            controller: FocusController::new(viewport, config),
            registry: MarkerRegistry::new(),
            hazards: Vec::new(),
        }
    }

    /// Hazards currently rendered.
    #[must_use]
    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    /// Looks up a rendered hazard by id.
    #[must_use]
    pub fn hazard(&self, id: &HazardId) -> Option<&Hazard> {
        self.hazards.iter().find(|h| &h.id == id)
    }

    /// The marker registry of this view.
    #[must_use]
    pub const fn registry(&self) -> &MarkerRegistry<H> {
        &self.registry
    }

    /// The focus controller of this view.
    #[must_use]
    pub const fn controller(&self) -> &FocusController<V> {
        &self.controller
    }

    /// Current focus state.
    #[must_use]
    pub const fn focus_state(&self) -> &FocusState {
        self.controller.state()
    }

    /// Replaces the rendered hazard set and rebuilds the registry.
    ///
    /// A focus in flight is left alone: its marker resolves again once the
    /// renderer registers it for the new set.
    pub fn replace_hazards(&mut self, hazards: Vec<Hazard>) {
        debug!(
            count = hazards.len(),
            generation = self.registry.generation() + 1,
            "replacing rendered hazards"
        );
        self.hazards = hazards;
        self.registry.rebuild();
    }

    /// Registers the marker handle for `id`. First registration wins.
    pub fn register_marker(&mut self, id: HazardId, handle: H) -> bool {
        self.registry.register(id, handle)
    }

    /// Starts focusing `target`.
    pub fn request_focus(&mut self, target: FocusTarget) -> FocusToken {
        self.controller.request_focus(target)
    }

    /// Focuses a rendered hazard at its own coordinates.
    ///
    /// Returns `None` if the hazard is not in the rendered set.
    pub fn focus_hazard(&mut self, id: &HazardId) -> Option<FocusToken> {
        let target = FocusTarget::new(id.clone(), self.hazard(id)?.coordinates());
        Some(self.controller.request_focus(target))
    }

    /// Handles a click on the marker of a rendered hazard.
    pub fn marker_clicked(&mut self, id: &HazardId) -> Option<FocusToken> {
        let target = FocusTarget::new(id.clone(), self.hazard(id)?.coordinates());
        Some(self.controller.marker_clicked(target))
    }

    /// Delivers a settle signal. See [`FocusController::handle_settled`].
    pub fn handle_settled(&mut self, signal: SettleSubscription) -> SettleOutcome {
        self.controller.handle_settled(signal, &self.registry)
    }

    /// Delivers a frame callback. See [`FocusController::handle_frame`].
    pub fn handle_frame(&mut self, token: FocusToken) -> FrameOutcome {
        self.controller.handle_frame(token, &self.registry)
    }

    /// Reloads the hazard set through `loader`.
    ///
    /// On failure the previously rendered hazards stay in place and the
    /// loader's state carries the error.
    ///
    /// # Errors
    ///
    /// Returns the source's [`SourceError`].
    pub async fn refresh<S: HazardSource>(
        &mut self,
        loader: &mut HazardLoader<S>,
    ) -> Result<usize, SourceError> {
        let hazards = loader.load().await?;
        let count = hazards.len();
        self.replace_hazards(hazards);
        info!(count, "map view refreshed");
        Ok(count)
    }
}
