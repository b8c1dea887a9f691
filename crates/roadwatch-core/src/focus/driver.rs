//! Async driver for a [`MapView`].
//!
//! The driver owns the view and serializes every input through one event
//! channel: host commands, viewport settle signals, marker registrations and
//! the delayed frame callbacks it schedules itself. Outcomes are published
//! on a report channel.
//!
//! ```text
//! FocusHandle ──▶ events ──▶ FocusDriver::run ──▶ reports
//!                   ▲               │
//!                   └── timer ◀─────┘ (AwaitingFrame: sleep render delay,
//!                                      then FrameRendered(token))
//! ```
//!
//! Timer tasks hold only a weak sender, so dropping every [`FocusHandle`]
//! ends the loop even while a frame callback is scheduled.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::controller::{FocusTarget, FrameOutcome, SettleOutcome};
use super::view::MapView;
use super::viewport::{FocusToken, SettleSubscription, Viewport};
use crate::hazard::HazardId;
use crate::loader::{HazardLoader, HazardSource};
use crate::registry::MarkerHandle;

// ============================================================================
// Constants
// ============================================================================

/// Capacity of the event channel into the driver.
pub const FOCUS_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the report channel out of the driver. Reports are dropped
/// when the consumer falls this far behind.
pub const FOCUS_REPORT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Events and reports
// ============================================================================

/// Input to the driver.
#[derive(Debug)]
pub enum FocusEvent<H> {
    /// Focus a rendered hazard at its own coordinates.
    Focus(HazardId),
    /// Focus an explicit target.
    FocusTarget(FocusTarget),
    /// A marker was clicked.
    MarkerClicked(HazardId),
    /// The viewport fired the settle signal registered as this subscription.
    Settled(SettleSubscription),
    /// One rendering cycle passed since the popup of `token` was opened.
    FrameRendered(FocusToken),
    /// The renderer announced a marker.
    RegisterMarker {
        /// Hazard the marker belongs to.
        id: HazardId,
        /// Rendering handle.
        handle: H,
    },
    /// Reload the hazard set through the loader.
    Refresh,
    /// Stop the driver.
    Shutdown,
}

/// Output of the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum FocusReport {
    /// A focus request started.
    Requested {
        /// Token of the new request.
        token: FocusToken,
        /// Hazard being focused.
        hazard_id: HazardId,
    },
    /// A focus was requested for a hazard that is not rendered.
    UnknownHazard(HazardId),
    /// A settle signal was delivered.
    Settled(SettleOutcome),
    /// A frame callback was delivered.
    Frame {
        /// Token the callback carried.
        token: FocusToken,
        /// What the controller did with it.
        outcome: FrameOutcome,
    },
    /// The hazard set was reloaded.
    Refreshed {
        /// Number of hazards now rendered.
        count: usize,
    },
    /// Reloading failed; the previous hazard set is still rendered.
    LoadFailed {
        /// Error message.
        message: String,
        /// Whether the loader allows another attempt.
        retryable: bool,
    },
}

/// Errors returned by [`FocusHandle`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DriverError {
    /// The driver has stopped.
    #[error("focus driver is not running")]
    Closed,
}

// ============================================================================
// Handle
// ============================================================================

/// Sends events to a running [`FocusDriver`].
#[derive(Debug)]
pub struct FocusHandle<H> {
    tx: mpsc::Sender<FocusEvent<H>>,
}

impl<H> Clone for FocusHandle<H> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<H> FocusHandle<H> {
    /// Sends a raw event.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Closed`] if the driver has stopped.
    pub async fn send(&self, event: FocusEvent<H>) -> Result<(), DriverError> {
        self.tx.send(event).await.map_err(|_| DriverError::Closed)
    }

    /// Focuses a rendered hazard.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Closed`] if the driver has stopped.
    pub async fn focus(&self, id: impl Into<HazardId>) -> Result<(), DriverError> {
        self.send(FocusEvent::Focus(id.into())).await
    }

    /// Reports a marker click.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Closed`] if the driver has stopped.
    pub async fn marker_clicked(&self, id: impl Into<HazardId>) -> Result<(), DriverError> {
        self.send(FocusEvent::MarkerClicked(id.into())).await
    }

    /// Forwards a viewport settle signal.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Closed`] if the driver has stopped.
    pub async fn settled(&self, signal: SettleSubscription) -> Result<(), DriverError> {
        self.send(FocusEvent::Settled(signal)).await
    }

    /// Registers a marker handle.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Closed`] if the driver has stopped.
    pub async fn register_marker(
        &self,
        id: impl Into<HazardId>,
        handle: H,
    ) -> Result<(), DriverError> {
        self.send(FocusEvent::RegisterMarker {
            id: id.into(),
            handle,
        })
        .await
    }

    /// Asks the driver to reload the hazard set.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Closed`] if the driver has stopped.
    pub async fn refresh(&self) -> Result<(), DriverError> {
        self.send(FocusEvent::Refresh).await
    }

    /// Stops the driver after the events already queued.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Closed`] if the driver has stopped.
    pub async fn shutdown(&self) -> Result<(), DriverError> {
        self.send(FocusEvent::Shutdown).await
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Event loop owning a [`MapView`] and its [`HazardLoader`].
pub struct FocusDriver<V, H, S> {
    view: MapView<V, H>,
    loader: HazardLoader<S>,
    render_delay: Duration,
    events: mpsc::Receiver<FocusEvent<H>>,
    feedback: mpsc::WeakSender<FocusEvent<H>>,
    reports: mpsc::Sender<FocusReport>,
}

impl<V, H, S> FocusDriver<V, H, S>
where
    V: Viewport + Send + 'static,
    H: MarkerHandle + Send + 'static,
    S: HazardSource + 'static,
{
    /// Spawns the driver on the current tokio runtime.
    ///
    /// The frame callback delay is taken from the view's
    /// [`FocusConfig`](super::FocusConfig). The join handle yields the view
    /// back once the driver stops.
    pub fn spawn(
        view: MapView<V, H>,
        loader: HazardLoader<S>,
    ) -> (
        FocusHandle<H>,
        mpsc::Receiver<FocusReport>,
        JoinHandle<MapView<V, H>>,
    ) {
        let (tx, events) = mpsc::channel(FOCUS_EVENT_CHANNEL_CAPACITY);
        let (reports, report_rx) = mpsc::channel(FOCUS_REPORT_CHANNEL_CAPACITY);
        let driver = Self {
            render_delay: view.controller().config().popup_render_delay,
            view,
            loader,
            events,
            feedback: tx.downgrade(),
            reports,
        };
        let task = tokio::spawn(driver.run());
        (FocusHandle { tx }, report_rx, task)
    }

    /// Processes events until [`FocusEvent::Shutdown`] or until every
    /// handle is dropped.
    async fn run(mut self) -> MapView<V, H> {
        info!("focus driver started");
        while let Some(event) = self.events.recv().await {
            if matches!(event, FocusEvent::Shutdown) {
                break;
            }
            self.handle_event(event).await;
        }
        info!("focus driver stopped");
        self.view
    }

    async fn handle_event(&mut self, event: FocusEvent<H>) {
        match event {
            FocusEvent::Focus(id) => {
                let token = self.view.focus_hazard(&id);
                self.report_request(id, token);
            },
            FocusEvent::MarkerClicked(id) => {
                let token = self.view.marker_clicked(&id);
                self.report_request(id, token);
            },
            FocusEvent::FocusTarget(target) => {
                let hazard_id = target.hazard_id.clone();
                let token = self.view.request_focus(target);
                self.report(FocusReport::Requested { token, hazard_id });
            },
            FocusEvent::Settled(signal) => {
                let outcome = self.view.handle_settled(signal);
                if let SettleOutcome::AwaitingFrame(token) = outcome {
                    self.schedule_frame(token);
                }
                if outcome != SettleOutcome::Ignored {
                    self.report(FocusReport::Settled(outcome));
                }
            },
            FocusEvent::FrameRendered(token) => {
                let outcome = self.view.handle_frame(token);
                self.report(FocusReport::Frame { token, outcome });
            },
            FocusEvent::RegisterMarker { id, handle } => {
                self.view.register_marker(id, handle);
            },
            FocusEvent::Refresh => match self.view.refresh(&mut self.loader).await {
                Ok(count) => self.report(FocusReport::Refreshed { count }),
                Err(err) => self.report(FocusReport::LoadFailed {
                    message: err.to_string(),
                    retryable: self.loader.can_retry(),
                }),
            },
            FocusEvent::Shutdown => {},
        }
    }

    fn report_request(&self, hazard_id: HazardId, token: Option<FocusToken>) {
        match token {
            Some(token) => self.report(FocusReport::Requested { token, hazard_id }),
            None => {
                debug!(%hazard_id, "focus requested for hazard that is not rendered");
                self.report(FocusReport::UnknownHazard(hazard_id));
            },
        }
    }

    fn schedule_frame(&self, token: FocusToken) {
        let feedback = self.feedback.clone();
        let delay = self.render_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = feedback.upgrade() {
                // A closed channel means the driver stopped; nothing to realign.
                let _ = tx.send(FocusEvent::FrameRendered(token)).await;
            } else {
                trace!(%token, "driver gone before frame callback");
            }
        });
    }

    fn report(&self, report: FocusReport) {
        if let Err(err) = self.reports.try_send(report) {
            match err {
                mpsc::error::TrySendError::Full(report) => {
                    warn!(?report, "report channel full, dropping report");
                },
                mpsc::error::TrySendError::Closed(_) => {},
            }
        }
    }
}
