//! Focus state machine.
//!
//! ```text
//!            request_focus                 settle (subscribed kind)
//!   Idle ─────────────────▶ Pending ─────────────────────────────▶ Realigning
//!    ▲                        │  ▲                                     │
//!    │   marker missing       │  │ request_focus (supersede:           │ frame rendered:
//!    └────────────────────────┘  │ unsubscribe, new token)             │ measure popup, pan_by
//!    ▲                           │                                     │
//!    └───────────────────────────┴─────────────────────────────────────┘
//! ```
//!
//! Every request gets a fresh [`FocusToken`]. Superseding a request
//! unsubscribes its settle listener and bumps the token, so settle signals
//! and frame callbacks carrying the old token are discarded even if the map
//! engine delivers them late. At most one
//! [`SettleSubscription`] is live at any time.

use std::time::Duration;

use tracing::{debug, trace};

use super::viewport::{FocusToken, PanOffset, SettleKind, SettleSubscription, Viewport};
use crate::hazard::{Coordinates, HazardId};
use crate::registry::{MarkerHandle, MarkerRegistry};

/// Zoom level used when focusing a hazard.
pub const DEFAULT_FOCUS_ZOOM: u8 = 16;

/// Pixels kept between the popup and the viewport edge.
pub const DEFAULT_POPUP_MARGIN_PX: f64 = 40.0;

/// Time allowed for a freshly opened popup to render before measuring it.
pub const DEFAULT_POPUP_RENDER_DELAY: Duration = Duration::from_millis(50);

/// Tuning for the focus controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusConfig {
    /// Zoom level used when focusing a hazard.
    pub focus_zoom: u8,
    /// Pixels kept between the popup and the viewport edge.
    pub popup_margin_px: f64,
    /// One rendering cycle, as seen by the async driver.
    pub popup_render_delay: Duration,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            focus_zoom: DEFAULT_FOCUS_ZOOM,
            popup_margin_px: DEFAULT_POPUP_MARGIN_PX,
            popup_render_delay: DEFAULT_POPUP_RENDER_DELAY,
        }
    }
}

/// A request to center the viewport on a hazard and show its popup.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusTarget {
    /// Hazard to focus.
    pub hazard_id: HazardId,
    /// Where to center the view.
    pub center: Coordinates,
}

impl FocusTarget {
    /// Creates a focus target.
    #[must_use]
    pub fn new(hazard_id: impl Into<HazardId>, center: Coordinates) -> Self {
        Self {
            hazard_id: hazard_id.into(),
            center,
        }
    }
}

/// Controller state.
#[derive(Debug, Clone, PartialEq)]
pub enum FocusState {
    /// No focus in flight.
    Idle,
    /// View change issued; waiting for the subscribed settle signal.
    Pending {
        /// Current request.
        token: FocusToken,
        /// Target of the current request.
        target: FocusTarget,
        /// The one live settle listener.
        subscription: SettleSubscription,
    },
    /// Popup opened; waiting one rendering cycle before measuring it.
    Realigning {
        /// Current request.
        token: FocusToken,
        /// Target of the current request.
        target: FocusTarget,
    },
}

impl FocusState {
    /// Token of the request in flight, if any.
    #[must_use]
    pub const fn token(&self) -> Option<FocusToken> {
        match self {
            Self::Idle => None,
            Self::Pending { token, .. } | Self::Realigning { token, .. } => Some(*token),
        }
    }

    /// Returns true if no focus is in flight.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Result of delivering a settle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Not the live subscription (other kind, superseded request, or nothing
    /// pending); nothing happened.
    Ignored,
    /// The target's marker is not registered (yet). Back to idle.
    MarkerMissing,
    /// Popup opened; call [`FocusController::handle_frame`] with this token
    /// after one rendering cycle.
    AwaitingFrame(FocusToken),
}

/// Result of delivering a rendering-cycle callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// The token was superseded or nothing is realigning.
    Stale,
    /// The popup had no measurable element. Back to idle without panning.
    PopupMissing,
    /// The view was panned to keep the popup visible.
    Panned(PanOffset),
}

/// Focus state machine over a [`Viewport`].
#[derive(Debug)]
pub struct FocusController<V> {
    viewport: V,
    config: FocusConfig,
    state: FocusState,
    last_token: u64,
}

impl<V: Viewport> FocusController<V> {
    /// Creates an idle controller.
    #[must_use]
    pub const fn new(viewport: V, config: FocusConfig) -> Self {
        Self {
            viewport,
            config,
            state: FocusState::Idle,
            last_token: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &FocusState {
        &self.state
    }

    /// Controller configuration.
    #[must_use]
    pub const fn config(&self) -> &FocusConfig {
        &self.config
    }

    /// The viewport this controller drives.
    #[must_use]
    pub const fn viewport(&self) -> &V {
        &self.viewport
    }

    /// Mutable access to the viewport, for hosts that share it.
    pub const fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    /// Starts focusing `target`, superseding any request in flight.
    ///
    /// Subscribes to the zoom settle signal if the current zoom differs from
    /// the focus zoom, otherwise to the move settle signal, then issues the
    /// view change.
    pub fn request_focus(&mut self, target: FocusTarget) -> FocusToken {
        self.supersede();

        self.last_token += 1;
        let token = FocusToken::new(self.last_token);
        let kind = if self.viewport.zoom() == self.config.focus_zoom {
            SettleKind::Move
        } else {
            SettleKind::Zoom
        };
        let subscription = SettleSubscription { kind, token };

        debug!(
            %token,
            hazard_id = %target.hazard_id,
            settle = %kind,
            "focus requested"
        );
        self.viewport.subscribe(subscription);
        self.viewport.set_view(target.center, self.config.focus_zoom);
        self.state = FocusState::Pending {
            token,
            target,
            subscription,
        };
        token
    }

    /// Focus entry point for a click on a marker.
    ///
    /// Goes through the same zoom comparison as
    /// [`request_focus`](Self::request_focus): when the map is already at the
    /// focus zoom the view only recenters.
    pub fn marker_clicked(&mut self, target: FocusTarget) -> FocusToken {
        trace!(hazard_id = %target.hazard_id, "marker clicked");
        self.request_focus(target)
    }

    /// Delivers a settle signal from the viewport.
    ///
    /// `signal` is the subscription the viewport fired for. It is accepted
    /// only if it is the live subscription of the pending request; signals
    /// of the other kind, or left over from a superseded request, are
    /// ignored. On a match the subscription is detached and the target's
    /// popup is opened.
    pub fn handle_settled<H: MarkerHandle>(
        &mut self,
        signal: SettleSubscription,
        registry: &MarkerRegistry<H>,
    ) -> SettleOutcome {
        let FocusState::Pending {
            token,
            target,
            subscription,
        } = &self.state
        else {
            trace!(settle = %signal.kind, token = %signal.token, "settle signal with no pending focus");
            return SettleOutcome::Ignored;
        };
        if subscription.token != signal.token {
            trace!(
                settle = %signal.kind,
                token = %signal.token,
                current = %token,
                "settle signal from superseded request"
            );
            return SettleOutcome::Ignored;
        }
        if subscription.kind != signal.kind {
            trace!(settle = %signal.kind, expected = %subscription.kind, "settle signal of other kind");
            return SettleOutcome::Ignored;
        }

        let (token, target, subscription) = (*token, target.clone(), *subscription);
        self.viewport.unsubscribe(subscription);

        let Some(handle) = registry.lookup(&target.hazard_id) else {
            debug!(%token, hazard_id = %target.hazard_id, "marker not registered, skipping popup");
            self.state = FocusState::Idle;
            return SettleOutcome::MarkerMissing;
        };

        handle.open_popup();
        self.state = FocusState::Realigning { token, target };
        SettleOutcome::AwaitingFrame(token)
    }

    /// Delivers the rendering-cycle callback for `token`.
    ///
    /// Measures the open popup and pans the view up by half its height plus
    /// the configured margin. Pan completion is not awaited.
    pub fn handle_frame<H: MarkerHandle>(
        &mut self,
        token: FocusToken,
        registry: &MarkerRegistry<H>,
    ) -> FrameOutcome {
        let FocusState::Realigning {
            token: current,
            target,
        } = &self.state
        else {
            trace!(%token, "frame callback with nothing realigning");
            return FrameOutcome::Stale;
        };
        if *current != token {
            trace!(%token, current = %current, "stale frame callback");
            return FrameOutcome::Stale;
        }

        let height = registry
            .lookup(&target.hazard_id)
            .and_then(MarkerHandle::popup_height);
        let hazard_id = target.hazard_id.clone();
        self.state = FocusState::Idle;

        let Some(height) = height else {
            debug!(%token, %hazard_id, "popup has no rendered element, not panning");
            return FrameOutcome::PopupMissing;
        };

        let offset = PanOffset {
            dx: 0.0,
            dy: -(height / 2.0 + self.config.popup_margin_px),
        };
        debug!(%token, %hazard_id, height, dy = offset.dy, "realigning popup");
        self.viewport.pan_by(offset);
        FrameOutcome::Panned(offset)
    }

    /// Abandons the request in flight, if any.
    pub fn cancel(&mut self) {
        self.supersede();
        self.state = FocusState::Idle;
    }

    fn supersede(&mut self) {
        match &self.state {
            FocusState::Idle => {},
            FocusState::Pending {
                token,
                subscription,
                ..
            } => {
                debug!(%token, "superseding pending focus");
                self.viewport.unsubscribe(*subscription);
            },
            FocusState::Realigning { token, .. } => {
                debug!(%token, "superseding realignment");
            },
        }
    }
}
