//! Viewport port consumed by the focus controller.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hazard::Coordinates;

/// Which settle signal a focus request waits for.
///
/// The map engine fires exactly one of these per view change: `Zoom` when
/// the zoom level changed, `Move` when only the center moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleKind {
    /// The zoom animation finished (`zoomend`).
    Zoom,
    /// The pan animation finished (`moveend`).
    Move,
}

impl fmt::Display for SettleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zoom => f.write_str("zoom"),
            Self::Move => f.write_str("move"),
        }
    }
}

/// Identifies one focus request.
///
/// Tokens increase monotonically per controller. A token that is no longer
/// the controller's current token is stale and every event carrying it is
/// discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FocusToken(u64);

impl FocusToken {
    pub(crate) const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw token value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FocusToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "focus#{}", self.0)
    }
}

/// A live listener registration on the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SettleSubscription {
    /// Signal listened for.
    pub kind: SettleKind,
    /// Request that owns the listener.
    pub token: FocusToken,
}

/// A relative pan in screen pixels. Negative `dy` moves the map content up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanOffset {
    /// Horizontal offset.
    pub dx: f64,
    /// Vertical offset.
    pub dy: f64,
}

/// The map engine as seen by the focus controller.
///
/// Commands are fire-and-forget. Completion is reported back to the
/// controller by whoever owns the engine, as the [`SettleSubscription`] the
/// listener was registered with. The token travels with the signal, so a
/// late signal for a detached listener is still told apart from the live one.
pub trait Viewport {
    /// Current zoom level.
    fn zoom(&self) -> u8;

    /// Centers the view on `center` at `zoom`, animated.
    fn set_view(&mut self, center: Coordinates, zoom: u8);

    /// Pans the view by `offset`, animated.
    fn pan_by(&mut self, offset: PanOffset);

    /// Starts delivering `subscription.kind` settle signals.
    fn subscribe(&mut self, subscription: SettleSubscription);

    /// Stops delivering signals for `subscription`.
    fn unsubscribe(&mut self, subscription: SettleSubscription);
}
