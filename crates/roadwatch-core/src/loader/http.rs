//! HTTP hazard source backed by the roadwatch API.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{HazardSource, SourceError};
use crate::hazard::Hazard;

/// Path of the map-plotting listing on the API.
const HAZARD_MAP_PATH: &str = "/hazard-map";

/// Fetches the hazard list from `GET {base_url}/hazard-map`.
#[derive(Debug, Clone)]
pub struct HttpHazardSource {
    client: reqwest::Client,
    url: String,
}

impl HttpHazardSource {
    /// Creates a source for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unavailable`] if the HTTP client cannot be
    /// built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}{HAZARD_MAP_PATH}", base_url.trim_end_matches('/')),
        })
    }

    /// Full URL the source fetches.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HazardSource for HttpHazardSource {
    async fn fetch_hazard_list(&self) -> Result<Vec<Hazard>, SourceError> {
        debug!(url = %self.url, "fetching hazard list");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(format!("request error: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(SourceError::Unavailable(format!(
                "hazard API responded with {status}"
            )));
        }
        if !status.is_success() {
            return Err(SourceError::Decode(format!(
                "hazard API responded with {status}"
            )));
        }

        response
            .json::<Vec<Hazard>>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let source = HttpHazardSource::new("http://localhost:8787/", Duration::from_secs(1)).unwrap();
        assert_eq!(source.url(), "http://localhost:8787/hazard-map");
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transient() {
        // Port 9 (discard) on localhost is closed in test environments.
        let source = HttpHazardSource::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = source.fetch_hazard_list().await.unwrap_err();
        assert!(err.is_transient());
    }
}
