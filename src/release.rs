//! Remote release feed client.
//!
//! Fetches the companion application's release list from the GitHub
//! releases API. The resolver only reads each release's tag, notes, and
//! first asset.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// HTTP timeout for feed requests.
const FEED_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while fetching the release feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport-level failure (DNS, connect, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("release API error: {0}")]
    Api(reqwest::StatusCode),

    /// The response body did not match the expected shape.
    #[error("failed to decode release feed: {0}")]
    Decode(String),
}

/// A downloadable artifact attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    /// Direct download URL for the archive.
    pub browser_download_url: String,
    /// When the asset was last uploaded or replaced.
    pub updated_at: DateTime<Utc>,
}

/// One entry of the remote release feed.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Release tag (`v1.2.3`, or `Dev` for the rolling dev build).
    pub tag_name: String,
    /// Free-text release notes.
    #[serde(default)]
    pub body: String,
    /// Attached artifacts; the first one is the install archive.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// Returns the first asset, if the release has any.
    #[must_use]
    pub fn primary_asset(&self) -> Option<&ReleaseAsset> {
        self.assets.first()
    }
}

/// GitHub-backed release feed client.
pub struct ReleaseClient {
    /// HTTP client for API requests.
    client: reqwest::blocking::Client,
    /// Repository in "owner/repo" format.
    repository: String,
}

impl ReleaseClient {
    /// Creates a new feed client for the given repository.
    #[must_use]
    pub fn new(repository: &str) -> Self {
        assert!(
            repository.contains('/'),
            "Repository must be in owner/repo format"
        );

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("launchpad/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(FEED_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Self {
            client,
            repository: repository.to_string(),
        }
    }

    /// Fetches all releases, newest first (the API's native order).
    pub fn fetch_releases(&self) -> Result<Vec<Release>, FeedError> {
        let url = format!("https://api.github.com/repos/{}/releases", self.repository);

        tracing::debug!("Fetching release feed from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Api(status));
        }

        let releases = response
            .json::<Vec<Release>>()
            .map_err(|e| FeedError::Decode(e.to_string()))?;

        tracing::info!("Release feed returned {} entries", releases.len());
        Ok(releases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_deserialization() {
        let json = r#"{
            "tag_name": "Dev",
            "body": "Nightly build v1.4.2",
            "assets": [
                {
                    "browser_download_url": "https://example.com/bundle.zip",
                    "updated_at": "2024-03-01T12:30:00Z"
                }
            ]
        }"#;

        let release: Release = serde_json::from_str(json).unwrap();
        assert_eq!(release.tag_name, "Dev");
        let asset = release.primary_asset().unwrap();
        assert_eq!(asset.browser_download_url, "https://example.com/bundle.zip");
        assert_eq!(asset.updated_at.to_rfc3339(), "2024-03-01T12:30:00+00:00");
    }

    #[test]
    fn test_release_defaults_for_missing_fields() {
        let release: Release = serde_json::from_str(r#"{"tag_name": "v2.0.0"}"#).unwrap();
        assert!(release.body.is_empty());
        assert!(release.primary_asset().is_none());
    }
}
