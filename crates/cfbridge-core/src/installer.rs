//! Checksum-verified install and update of the cloudflared binary.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use flate2::read::GzDecoder;
use regex::Regex;
use tar::Archive;
use tracing::debug;

use crate::error::UpdateError;
use crate::platform::BinaryAsset;
use crate::release::{sha256_file, Release, ReleaseClient};
use crate::sink::BridgeSink;

/// Installs the resolved release asset and keeps it current against the
/// checksum published in the release notes.
///
/// The existing binary is never removed before its replacement is staged:
/// downloads land in a `.part` file and archives extract into a staging
/// directory, and only a final rename touches the live binary path. A
/// failed download or extraction therefore leaves a previously working
/// install usable.
pub struct UpdateInstaller {
    client: Arc<dyn ReleaseClient>,
    asset: BinaryAsset,
    sink: Arc<dyn BridgeSink>,
}

impl UpdateInstaller {
    pub fn new(
        client: Arc<dyn ReleaseClient>,
        asset: BinaryAsset,
        sink: Arc<dyn BridgeSink>,
    ) -> Self {
        Self {
            client,
            asset,
            sink,
        }
    }

    /// Verify the local binary against the latest release and reinstall it
    /// when the published checksum differs or no binary exists.
    pub async fn ensure_up_to_date(&self, install_dir: &Path) -> Result<(), UpdateError> {
        self.sink.info("Checking for cloudflared updates...");
        let release = self.client.latest_release().await?;

        let binary_path = install_dir.join(&self.asset.binary_name);
        let expected = extract_digest(&release.body, &self.asset.asset_name);

        if binary_path.exists() {
            let Some(expected) = expected else {
                self.sink.warning(&format!(
                    "Could not find hash for {} in release notes. Skipping update check.",
                    self.asset.asset_name
                ));
                return Ok(());
            };

            match sha256_file(&binary_path) {
                Ok(local) if local.eq_ignore_ascii_case(&expected) => {
                    self.sink.info("cloudflared is up to date.");
                    return Ok(());
                }
                Ok(local) => {
                    self.sink.info(&format!(
                        "Hash mismatch (local: {local}, expected: {expected}). Re-downloading."
                    ));
                }
                Err(e) => {
                    // Transient hashing failures should not trigger a
                    // redownload on every run.
                    self.sink.warning(&format!(
                        "Could not hash local binary ({e}). Keeping existing install."
                    ));
                    return Ok(());
                }
            }
        }

        self.sink.info(&format!(
            "Downloading cloudflared ({})...",
            self.asset.asset_name
        ));
        self.install(&release, install_dir, &binary_path).await
    }

    /// Download the resolved asset and move the new binary into place.
    async fn install(
        &self,
        release: &Release,
        install_dir: &Path,
        binary_path: &Path,
    ) -> Result<(), UpdateError> {
        let url = release
            .download_url(&self.asset.asset_name)
            .ok_or_else(|| UpdateError::AssetNotFound(self.asset.asset_name.clone()))?;

        let download_path = install_dir.join(format!("{}.part", self.asset.asset_name));
        if let Err(e) = self.client.download(url, &download_path).await {
            let _ = fs::remove_file(&download_path);
            return Err(e);
        }

        if self.asset.archived {
            let result = self.install_from_archive(&download_path, install_dir, binary_path);
            let _ = fs::remove_file(&download_path);
            result?;
        } else {
            replace_file(&download_path, binary_path)?;
        }

        self.sink.info("cloudflared installed successfully.");
        Ok(())
    }

    /// Extract a `.tgz` asset into a staging directory and promote the
    /// binary from it.
    fn install_from_archive(
        &self,
        archive_path: &Path,
        install_dir: &Path,
        binary_path: &Path,
    ) -> Result<(), UpdateError> {
        let staging = install_dir.join(".extract");
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let result = extract_tar_gz(archive_path, &staging).and_then(|()| {
            let extracted = staging.join(&self.asset.binary_name);
            if !extracted.exists() {
                return Err(UpdateError::Extraction(format!(
                    "'{}' binary not found in archive",
                    self.asset.binary_name
                )));
            }
            replace_file(&extracted, binary_path)
        });

        let _ = fs::remove_dir_all(&staging);
        result
    }
}

/// Extract the expected digest for `asset_name` from free-text release
/// notes. Lines look like `cloudflared-linux-amd64: <64 hex chars>`.
/// Absence of a matching line means verification is skipped, not an error.
pub fn extract_digest(body: &str, asset_name: &str) -> Option<String> {
    let pattern = format!(r"{}\s*:\s*([a-fA-F0-9]{{64}})", regex::escape(asset_name));
    let re = Regex::new(&pattern).ok()?;
    re.captures(body).map(|c| c[1].to_string())
}

/// Move `src` over `dest`, replacing any existing file.
fn replace_file(src: &Path, dest: &Path) -> Result<(), UpdateError> {
    // Windows rename does not overwrite.
    #[cfg(windows)]
    if dest.exists() {
        fs::remove_file(dest)?;
    }
    fs::rename(src, dest)?;
    debug!("Installed binary at {}", dest.display());
    Ok(())
}

/// Unpack a gzip-compressed tar archive, preserving directory structure.
fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<(), UpdateError> {
    let file = fs::File::open(archive_path)?;
    let decoder = GzDecoder::new(std::io::BufReader::new(file));
    let mut archive = Archive::new(decoder);
    archive
        .unpack(dest)
        .map_err(|e| UpdateError::Extraction(e.to_string()))
}
