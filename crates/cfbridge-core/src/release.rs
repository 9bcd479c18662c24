//! GitHub release feed client.
//!
//! The feed is the source of truth for the latest distributable binary and
//! the per-asset checksums embedded in its release notes.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::UpdateError;

/// Latest-release endpoint for the cloudflared distribution.
pub const RELEASE_FEED_URL: &str =
    "https://api.github.com/repos/cloudflare/cloudflared/releases/latest";

/// User agent sent with feed requests. GitHub rejects requests without one.
const USER_AGENT: &str = "cloudflared-bridge";

/// Latest-release metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Free-text release notes containing `<assetName>: <sha256>` lines.
    #[serde(default)]
    pub body: String,
    /// Downloadable assets attached to the release.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// One downloadable asset attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

impl Release {
    /// Exact-name lookup of an asset's download URL.
    pub fn download_url(&self, asset_name: &str) -> Option<&str> {
        self.assets
            .iter()
            .find(|a| a.name == asset_name)
            .map(|a| a.browser_download_url.as_str())
    }
}

/// Network boundary of the install/update path.
///
/// The installer depends on this trait rather than on reqwest directly so
/// the update logic can be exercised without a network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseClient: Send + Sync {
    /// Fetch the latest-release metadata from the feed.
    async fn latest_release(&self) -> Result<Release, UpdateError>;

    /// Download a URL to a local file.
    async fn download(&self, url: &str, dest: &Path) -> Result<(), UpdateError>;
}

/// HTTP implementation of [`ReleaseClient`] backed by reqwest.
pub struct HttpReleaseClient {
    client: reqwest::Client,
    feed_url: String,
}

impl HttpReleaseClient {
    /// Create a client against the default release feed.
    pub fn new() -> Self {
        Self::with_url(RELEASE_FEED_URL.to_string())
    }

    /// Create a client against a custom feed URL.
    pub fn with_url(feed_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            feed_url,
        }
    }
}

impl Default for HttpReleaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReleaseClient for HttpReleaseClient {
    async fn latest_release(&self) -> Result<Release, UpdateError> {
        debug!("Fetching release metadata from {}", self.feed_url);
        let response = self
            .client
            .get(&self.feed_url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| UpdateError::Network(e.to_string()))?
            .error_for_status()
            .map_err(|e| UpdateError::Network(e.to_string()))?;

        response
            .json::<Release>()
            .await
            .map_err(|e| UpdateError::MalformedFeed(e.to_string()))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), UpdateError> {
        debug!("Downloading {} to {}", url, dest.display());
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| UpdateError::Network(e.to_string()))?
            .error_for_status()
            .map_err(|e| UpdateError::Network(e.to_string()))?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| UpdateError::Network(e.to_string()))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

/// Compute the hex-encoded SHA-256 digest of a file.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
