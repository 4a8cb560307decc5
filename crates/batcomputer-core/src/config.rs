//! Console configuration persistence
//!
//! Loaded from `config.toml` in the data directory, with environment
//! variables supplying the remote store settings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::auth::LockoutPolicy;
use crate::credentials::{CredentialError, CredentialTable};

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Data directory name under the platform data dir
const DATA_DIR_NAME: &str = "batcomputer";

/// Managed store URL
pub const STORE_URL_ENV: &str = "SUPABASE_URL";
/// Managed store anonymous key
pub const STORE_KEY_ENV: &str = "SUPABASE_ANON_KEY";

/// Console configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// TOML file replacing the built-in credential table
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,

    /// Lockout escalation
    #[serde(default)]
    pub lockout: LockoutPolicy,

    /// Remote record store
    #[serde(default)]
    pub store: StoreConfig,
}

/// Remote record store settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: Option<String>,

    /// Usually left out of the file and supplied via `SUPABASE_ANON_KEY`
    #[serde(default, skip_serializing)]
    pub anon_key: Option<String>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

impl ConsoleConfig {
    /// Platform default data directory
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DATA_DIR_NAME)
    }

    pub fn config_file_path(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE_NAME)
    }

    /// Load configuration from `data_dir`, then apply the environment
    ///
    /// A missing file yields the defaults.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::config_file_path(data_dir);
        let mut config = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            toml::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                reason: e.to_string(),
            })?
        } else {
            tracing::debug!("No config at {:?}, using defaults", path);
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Save configuration to `data_dir`
    pub fn save(&self, data_dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(data_dir)?;
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        let path = Self::config_file_path(data_dir);
        fs::write(&path, contents)?;

        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Fill store settings from the environment; non-empty variables win
    pub fn apply_env(&mut self) {
        if let Some(url) = non_empty_env(STORE_URL_ENV) {
            self.store.url = Some(url);
        }
        if let Some(key) = non_empty_env(STORE_KEY_ENV) {
            self.store.anon_key = Some(key);
        }
    }

    /// Credential table selected by this configuration
    pub fn credential_table(&self) -> Result<CredentialTable, CredentialError> {
        match &self.credentials_file {
            Some(path) => CredentialTable::from_file(path),
            None => Ok(CredentialTable::builtin()),
        }
    }
}

impl StoreConfig {
    /// URL and key, if both are configured
    pub fn endpoint(&self) -> Option<(&str, &str)> {
        match (&self.url, &self.anon_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
