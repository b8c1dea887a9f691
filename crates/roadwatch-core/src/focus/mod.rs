//! Map Focus Controller.
//!
//! Focusing a hazard is a two-step asynchronous sequence: the view is moved
//! (and zoomed) to the hazard, and only once the map engine reports that the
//! movement settled is the hazard's popup opened. One rendering cycle later
//! the popup is measured and the view is panned up so the popup is fully
//! visible above the marker.
//!
//! - [`FocusController`]: the synchronous state machine. Callers feed it
//!   settle signals and frame callbacks and inspect the outcomes.
//! - [`MapView`]: a controller bundled with its
//!   [`MarkerRegistry`](crate::registry::MarkerRegistry) and the rendered
//!   hazard set.
//! - [`FocusDriver`]: a tokio task that owns a [`MapView`], serializes all
//!   inputs through one channel and schedules the frame callback itself.
//!
//! A newer request always supersedes an older one. Signals and callbacks
//! tagged with a superseded [`FocusToken`] are discarded, and the viewport
//! never carries more than one settle subscription.

mod controller;
mod driver;
mod view;
mod viewport;


pub use controller::{
    DEFAULT_FOCUS_ZOOM, DEFAULT_POPUP_MARGIN_PX, DEFAULT_POPUP_RENDER_DELAY, FocusConfig,
    FocusController, FocusState, FocusTarget, FrameOutcome, SettleOutcome,
};
pub use driver::{
    DriverError, FOCUS_EVENT_CHANNEL_CAPACITY, FOCUS_REPORT_CHANNEL_CAPACITY, FocusDriver,
    FocusEvent, FocusHandle, FocusReport,
};
pub use view::MapView;
pub use viewport::{FocusToken, PanOffset, SettleKind, SettleSubscription, Viewport};
