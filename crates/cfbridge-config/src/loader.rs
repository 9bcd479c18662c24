//! Configuration loader.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::ConfigError;
use crate::schema::BridgeConfig;

/// Loads `config.yml` from the bridge install root, creating a default file
/// with placeholder entries when none exists.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file, materializing a default file
    /// first if the path does not exist.
    pub fn load_or_create(path: &Path) -> Result<BridgeConfig, ConfigError> {
        if !path.exists() {
            Self::write_default(path)?;
            info!("Created default config at {}", path.display());
        }
        Self::load(path)
    }

    /// Load configuration from an existing YAML file.
    pub fn load(path: &Path) -> Result<BridgeConfig, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<BridgeConfig, ConfigError> {
        // serde_yml maps an empty document to an error for struct targets;
        // surface a clearer message for the missing key case.
        let value: serde_yml::Value = serde_yml::from_str(content)?;
        match value.get("tokenlist") {
            None => return Err(ConfigError::MissingField("tokenlist".to_string())),
            Some(tokens) if !tokens.is_sequence() => {
                return Err(ConfigError::InvalidFormat(
                    "tokenlist must be a list of strings".to_string(),
                ));
            }
            Some(_) => {}
        }
        let config: BridgeConfig = serde_yml::from_value(value)?;
        Ok(config)
    }

    /// Write a default config file with placeholder token entries.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yml::to_string(&BridgeConfig::default())?;
        fs::write(path, yaml)?;
        Ok(())
    }
}
