use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Client configuration. Every field has a default, so a TOML file only
/// needs the keys it overrides.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Stand-in for the hosted document database and object storage.
    pub backend_path: PathBuf,
    /// Device-local key-value store.
    pub device_path: PathBuf,
    pub bcrypt_cost: u32,
    pub default_avatar: String,
    pub unknown_sender_name: String,
    pub blob_url_prefix: String,
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_path: PathBuf::from("chat_backend.sqlite"),
            device_path: PathBuf::from("chat_device.sqlite"),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            default_avatar: "default-avatar-uri".to_string(),
            unknown_sender_name: "Unknown".to_string(),
            blob_url_prefix: "blob://".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults with both database files placed under `base_dir`.
    pub fn with_base_dir(base_dir: impl AsRef<Path>) -> Self {
        let base_dir = base_dir.as_ref();
        Self {
            backend_path: base_dir.join("chat_backend.sqlite"),
            device_path: base_dir.join("chat_device.sqlite"),
            ..Self::default()
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // bcrypt only accepts costs in 4..=31
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "bcrypt_cost must be between 4 and 31, got {}",
                self.bcrypt_cost
            )));
        }
        if self.backend_path == self.device_path {
            return Err(ConfigError::Invalid(
                "backend_path and device_path must differ".to_string(),
            ));
        }
        Ok(())
    }
}
