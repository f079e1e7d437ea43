//! Service configuration

use crate::entity::types::EntityError;
use anyhow::{Context, Result, anyhow};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File name looked up by [`ServiceConfig::load_from_path`]
pub const CONFIG_FILE_NAME: &str = "sforce.yaml";
/// Directory under the home directory holding the user-wide config
pub const CONFIG_DIR_NAME: &str = ".sforce";

pub const DEFAULT_API_VERSION: &str = "26.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(default)]
#[builder(
    default,
    setter(into),
    build_fn(error = "crate::entity::types::EntityError")
)]
pub struct ServiceConfig {
    /// Substituted for `{version}` in the OAuth partner URL
    pub api_version: String,
    /// Connection timeout handed to the binding
    pub timeout_secs: u64,
    /// Fail operations on a disconnected service instead of returning empty results
    pub require_connection: bool,
    /// Read with `queryAll`, which also returns deleted and archived records
    pub include_deleted: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            require_connection: true,
            include_deleted: true,
        }
    }
}

impl ServiceConfig {
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), EntityError> {
        if self.api_version.trim().is_empty() {
            return Err(EntityError::configuration("api_version must not be empty"));
        }
        Ok(())
    }

    /// Load configuration from `sforce.yaml` in the given directory
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(anyhow!(
                "Configuration file not found at: {}",
                config_path.display()
            ));
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: ServiceConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

        Ok(config)
    }

    /// Save configuration as `sforce.yaml` in the given directory
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_path = path.as_ref().join(CONFIG_FILE_NAME);

        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// `~/.sforce`, if a home directory is known
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME))
    }

    /// Load the user-wide config, falling back to defaults when there is none
    pub fn load_default() -> Result<Self> {
        match Self::default_dir() {
            Some(dir) if dir.join(CONFIG_FILE_NAME).exists() => Self::load_from_path(dir),
            _ => {
                debug!("No user config found, using defaults");
                Ok(Self::default())
            }
        }
    }
}
