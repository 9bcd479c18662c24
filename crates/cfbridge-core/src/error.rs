//! Bridge lifecycle errors.

use thiserror::Error;

/// Errors from the install/update path.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Release feed unreachable or a download failed.
    #[error("Release feed request failed: {0}")]
    Network(String),

    /// Release metadata did not decode into the expected shape.
    #[error("Malformed release metadata: {0}")]
    MalformedFeed(String),

    /// The resolved asset name is absent from the latest release.
    #[error("Asset {0} not found in latest release")]
    AssetNotFound(String),

    /// Archive extraction did not produce the expected binary.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors caught at the `init`/`start` boundary before being converted to
/// log output.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration load failure.
    #[error("Configuration error: {0}")]
    Config(#[from] cfbridge_config::ConfigError),

    /// Install/update failure.
    #[error("Update error: {0}")]
    Update(#[from] UpdateError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_not_found_display() {
        let err = UpdateError::AssetNotFound("cloudflared-linux-amd64".to_string());
        let msg = err.to_string();
        assert!(msg.contains("cloudflared-linux-amd64"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_network_error_display() {
        let err = UpdateError::Network("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_extraction_error_display() {
        let err = UpdateError::Extraction("'cloudflared' binary not found".to_string());
        assert!(err.to_string().contains("Extraction failed"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: UpdateError = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_bridge_error_from_update() {
        let err: BridgeError =
            BridgeError::from(UpdateError::Network("timed out".to_string()));
        assert!(err.to_string().contains("timed out"));
    }
}
