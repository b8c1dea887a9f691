//! Hazard loading port.
//!
//! The map does not fetch hazards itself. It is handed a [`HazardLoader`]
//! wrapping some [`HazardSource`] (the HTTP API in production, an in-memory
//! store in tests) and reads the outcome from [`LoadState`].
//!
//! A failed load is never swallowed: the loader moves to
//! [`LoadState::Failed`], which records the attempt count and tells the host
//! whether another attempt is allowed. Retrying is the host's decision; the
//! loader never retries on its own.

mod http;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

pub use self::http::HttpHazardSource;
use crate::hazard::Hazard;

/// Default number of load attempts before a failure stops being retryable.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Errors raised by a [`HazardSource`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceError {
    /// The source could not be reached or answered with a server error.
    #[error("hazard source unavailable: {0}")]
    Unavailable(String),

    /// The source answered with a body that is not a hazard list.
    #[error("invalid hazard list: {0}")]
    Decode(String),
}

impl SourceError {
    /// Returns true for failures worth retrying unchanged.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// A provider of the current hazard set.
#[async_trait]
pub trait HazardSource: Send + Sync {
    /// Fetches the hazard list. The list is bounded; there is no cursor.
    async fn fetch_hazard_list(&self) -> Result<Vec<Hazard>, SourceError>;
}

/// Outcome of the most recent load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing loaded yet.
    #[default]
    Idle,
    /// The last load succeeded.
    Ready {
        /// Number of hazards loaded.
        count: usize,
    },
    /// Loads have failed `attempts` times in a row.
    Failed {
        /// Error message of the latest failure.
        message: String,
        /// Consecutive failed attempts.
        attempts: u32,
        /// Whether the latest failure was transient.
        transient: bool,
    },
}

/// Drives a [`HazardSource`] and keeps the [`LoadState`].
#[derive(Debug)]
pub struct HazardLoader<S> {
    source: S,
    state: LoadState,
    max_attempts: u32,
}

impl<S: HazardSource> HazardLoader<S> {
    /// Creates a loader allowing [`DEFAULT_MAX_ATTEMPTS`] consecutive
    /// attempts.
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self::with_max_attempts(source, DEFAULT_MAX_ATTEMPTS)
    }

    /// Creates a loader allowing `max_attempts` consecutive attempts.
    #[must_use]
    pub const fn with_max_attempts(source: S, max_attempts: u32) -> Self {
        Self {
            source,
            state: LoadState::Idle,
            max_attempts,
        }
    }

    /// Returns the state of the most recent load.
    #[must_use]
    pub const fn state(&self) -> &LoadState {
        &self.state
    }

    /// The wrapped source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Consecutive failed attempts allowed before retrying stops.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true if a failed load may be attempted again.
    #[must_use]
    pub const fn can_retry(&self) -> bool {
        match &self.state {
            LoadState::Failed {
                attempts,
                transient,
                ..
            } => *transient && *attempts < self.max_attempts,
            LoadState::Idle | LoadState::Ready { .. } => true,
        }
    }

    /// Fetches the hazard list once.
    ///
    /// On success the state becomes [`LoadState::Ready`]; an empty list is
    /// a normal result. On failure the state becomes [`LoadState::Failed`]
    /// with the attempt counter incremented, and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the source's [`SourceError`].
    pub async fn load(&mut self) -> Result<Vec<Hazard>, SourceError> {
        match self.source.fetch_hazard_list().await {
            Ok(hazards) => {
                info!(count = hazards.len(), "hazard list loaded");
                self.state = LoadState::Ready {
                    count: hazards.len(),
                };
                Ok(hazards)
            },
            Err(err) => {
                let attempts = match &self.state {
                    LoadState::Failed { attempts, .. } => attempts + 1,
                    LoadState::Idle | LoadState::Ready { .. } => 1,
                };
                warn!(error = %err, attempts, "failed to load hazard list");
                self.state = LoadState::Failed {
                    message: err.to_string(),
                    attempts,
                    transient: err.is_transient(),
                };
                Err(err)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::hazard::HazardId;

    /// Source that replays a scripted sequence of results.
    struct ScriptedSource {
        results: Mutex<Vec<Result<Vec<Hazard>, SourceError>>>,
    }

    impl ScriptedSource {
        fn new(mut results: Vec<Result<Vec<Hazard>, SourceError>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
            }
        }
    }

    #[async_trait]
    impl HazardSource for ScriptedSource {
        async fn fetch_hazard_list(&self) -> Result<Vec<Hazard>, SourceError> {
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(SourceError::Unavailable("script exhausted".into())))
        }
    }

    fn hazard(id: &str) -> Hazard {
        Hazard {
            id: HazardId::from(id),
            latitude: 2.9,
            longitude: 101.8,
            hazard_type: "pothole".into(),
            risk_level: "high".into(),
            repair_material: None,
            volume_material_required: None,
            manpower_required: None,
            image_url: None,
            state: None,
            reported_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_empty_list_is_ready() {
        let mut loader = HazardLoader::new(ScriptedSource::new(vec![Ok(vec![])]));

        let hazards = loader.load().await.unwrap();
        assert!(hazards.is_empty());
        assert_eq!(loader.state(), &LoadState::Ready { count: 0 });
    }

    #[tokio::test]
    async fn test_failure_is_surfaced_and_retryable() {
        let mut loader = HazardLoader::new(ScriptedSource::new(vec![
            Err(SourceError::Unavailable("connection refused".into())),
            Ok(vec![hazard("1")]),
        ]));

        let err = loader.load().await.unwrap_err();
        assert!(err.is_transient());
        assert!(matches!(
            loader.state(),
            LoadState::Failed { attempts: 1, transient: true, .. }
        ));
        assert!(loader.can_retry());

        let hazards = loader.load().await.unwrap();
        assert_eq!(hazards.len(), 1);
        assert_eq!(loader.state(), &LoadState::Ready { count: 1 });
    }

    #[tokio::test]
    async fn test_retry_budget_exhausts() {
        let failures = (0..2)
            .map(|_| Err(SourceError::Unavailable("timeout".into())))
            .collect();
        let mut loader = HazardLoader::with_max_attempts(ScriptedSource::new(failures), 2);

        loader.load().await.unwrap_err();
        assert!(loader.can_retry());
        loader.load().await.unwrap_err();
        assert!(!loader.can_retry());
        assert!(matches!(loader.state(), LoadState::Failed { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_decode_failure_is_not_retryable() {
        let mut loader = HazardLoader::new(ScriptedSource::new(vec![Err(SourceError::Decode(
            "expected array".into(),
        ))]));

        loader.load().await.unwrap_err();
        assert!(!loader.can_retry());
    }
}
