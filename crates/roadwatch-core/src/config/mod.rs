//! Configuration parsing and management.
//!
//! One TOML file configures both the daemon and map hosts:
//!
//! ```toml
//! [map]
//! focus_zoom = 16
//! popup_margin_px = 40.0
//!
//! [daemon]
//! listen_addr = "0.0.0.0:8787"
//! database_path = "/var/lib/roadwatch/roadwatch.db"
//!
//! [source]
//! api_base_url = "https://roadwatch.example.org"
//! ```
//!
//! Every section and field is optional.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::focus::{DEFAULT_FOCUS_ZOOM, DEFAULT_POPUP_MARGIN_PX, FocusConfig, MapView, Viewport};
use crate::hazard::Coordinates;
use crate::loader::{DEFAULT_MAX_ATTEMPTS, HazardLoader, HttpHazardSource, SourceError};
use crate::registry::MarkerHandle;
use crate::store::DEFAULT_LIST_LIMIT;

/// Highest zoom level accepted for map settings.
pub const MAX_ZOOM: u8 = 22;

/// Upper bound for `daemon.list_limit`.
pub const MAX_LIST_LIMIT: u32 = 1000;

/// Top-level roadwatch configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadwatchConfig {
    /// Map view settings.
    #[serde(default)]
    pub map: MapConfig,

    /// HTTP daemon settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Hazard source settings for map hosts.
    #[serde(default)]
    pub source: SourceConfig,
}

impl RoadwatchConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a value is out of range.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check value ranges across all sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.map.validate()?;
        self.daemon.validate()?;
        self.source.validate()
    }
}

/// Map view configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapConfig {
    /// Where the map opens.
    #[serde(default = "default_initial_center")]
    pub initial_center: Coordinates,

    /// Zoom level the map opens at.
    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: u8,

    /// Zoom level used when focusing a hazard.
    #[serde(default = "default_focus_zoom")]
    pub focus_zoom: u8,

    /// Pixels kept between an open popup and the viewport edge.
    #[serde(default = "default_popup_margin_px")]
    pub popup_margin_px: f64,

    /// Delay standing in for one rendering cycle, in milliseconds.
    #[serde(default = "default_popup_render_delay_ms")]
    pub popup_render_delay_ms: u64,
}

impl MapConfig {
    /// Controller settings derived from this section.
    #[must_use]
    pub const fn focus_config(&self) -> FocusConfig {
        FocusConfig {
            focus_zoom: self.focus_zoom,
            popup_margin_px: self.popup_margin_px,
            popup_render_delay: Duration::from_millis(self.popup_render_delay_ms),
        }
    }

    /// Opens a map view: moves `viewport` to the initial position and wraps
    /// it in a [`MapView`] using [`focus_config`](Self::focus_config).
    #[must_use]
    pub fn open_view<V: Viewport, H: MarkerHandle>(&self, mut viewport: V) -> MapView<V, H> {
        viewport.set_view(self.initial_center, self.initial_zoom);
        MapView::new(viewport, self.focus_config())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.focus_zoom > MAX_ZOOM {
            return Err(ConfigError::Validation(format!(
                "map.focus_zoom must be at most {MAX_ZOOM}, got {}",
                self.focus_zoom
            )));
        }
        if self.initial_zoom > MAX_ZOOM {
            return Err(ConfigError::Validation(format!(
                "map.initial_zoom must be at most {MAX_ZOOM}, got {}",
                self.initial_zoom
            )));
        }
        if !self.popup_margin_px.is_finite() || self.popup_margin_px < 0.0 {
            return Err(ConfigError::Validation(format!(
                "map.popup_margin_px must be a non-negative number, got {}",
                self.popup_margin_px
            )));
        }
        let Coordinates {
            latitude,
            longitude,
        } = self.initial_center;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ConfigError::Validation(format!(
                "map.initial_center is not a valid position: ({latitude}, {longitude})"
            )));
        }
        Ok(())
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_center: default_initial_center(),
            initial_zoom: default_initial_zoom(),
            focus_zoom: default_focus_zoom(),
            popup_margin_px: default_popup_margin_px(),
            popup_render_delay_ms: default_popup_render_delay_ms(),
        }
    }
}

/// HTTP daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Address the API listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// `SQLite` database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Row cap for the listing endpoints.
    #[serde(default = "default_list_limit")]
    pub list_limit: u32,
}

impl DaemonConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.list_limit == 0 || self.list_limit > MAX_LIST_LIMIT {
            return Err(ConfigError::Validation(format!(
                "daemon.list_limit must be between 1 and {MAX_LIST_LIMIT}, got {}",
                self.list_limit
            )));
        }
        Ok(())
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            database_path: default_database_path(),
            list_limit: default_list_limit(),
        }
    }
}

/// Hazard source configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Base URL of the roadwatch API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Consecutive failed loads after which retrying stops.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl SourceConfig {
    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Builds a loader over the HTTP API described by this section.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unavailable`] if the HTTP client cannot be
    /// built.
    pub fn loader(&self) -> Result<HazardLoader<HttpHazardSource>, SourceError> {
        let source = HttpHazardSource::new(&self.api_base_url, self.request_timeout())?;
        Ok(HazardLoader::with_max_attempts(source, self.max_attempts))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "source.api_base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "source.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "source.request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            max_attempts: default_max_attempts(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

const fn default_initial_center() -> Coordinates {
    Coordinates::new(2.945_747, 101.875_09)
}

const fn default_initial_zoom() -> u8 {
    11
}

const fn default_focus_zoom() -> u8 {
    DEFAULT_FOCUS_ZOOM
}

const fn default_popup_margin_px() -> f64 {
    DEFAULT_POPUP_MARGIN_PX
}

const fn default_popup_render_delay_ms() -> u64 {
    50
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

fn default_database_path() -> PathBuf {
    PathBuf::from("roadwatch.db")
}

const fn default_list_limit() -> u32 {
    DEFAULT_LIST_LIMIT
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8787".to_string()
}

const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

/// Configuration errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}
