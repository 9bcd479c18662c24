//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_format_error() {
        let err = ConfigError::InvalidFormat("expected sequence".to_string());
        assert!(err.to_string().contains("expected sequence"));
        assert!(err.to_string().contains("Invalid"));
    }

    #[test]
    fn test_missing_field_error() {
        let err = ConfigError::MissingField("tokenlist".to_string());
        assert!(err.to_string().contains("tokenlist"));
        assert!(err.to_string().contains("Missing"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::from(io_err);
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_debug() {
        let err = ConfigError::MissingField("tokenlist".to_string());
        let debug = format!("{:?}", err);
        assert!(debug.contains("MissingField"));
    }
}
