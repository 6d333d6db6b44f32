//! Configuration loading and management
//!
//! Handles parsing of `fabtrack.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fabric::builtin_fabrics;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Fabric selected when no persisted state names one
    #[serde(default = "default_fabric")]
    pub default_fabric: String,

    /// Identity configuration
    #[serde(default)]
    pub user: UserConfig,

    /// File locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Synchronizer configuration
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_fabric: default_fabric(),
            user: UserConfig::default(),
            paths: PathsConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

fn default_fabric() -> String {
    "north-it".to_string()
}

/// Identity used for comments and mention notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Stable user id
    #[serde(default = "default_user_id")]
    pub id: String,

    /// Display name shown in mention markup
    #[serde(default = "default_user_name")]
    pub display_name: String,
}

fn default_user_id() -> String {
    "local-user".to_string()
}

fn default_user_name() -> String {
    "Local User".to_string()
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: default_user_id(),
            display_name: default_user_name(),
        }
    }
}

/// File locations; unset paths fall back to the working directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Snapshot cache file
    #[serde(default)]
    pub cache_file: Option<PathBuf>,

    /// Task catalog file
    #[serde(default)]
    pub catalog_file: Option<PathBuf>,
}

/// Synchronizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between remote reconciliation pushes
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Seconds to wait before a realtime reconnect attempt
    #[serde(default = "default_reconnect_secs")]
    pub reconnect_delay_secs: u64,

    /// Shared directory the snapshot is reconciled against; sync runs
    /// cache-only when unset
    #[serde(default)]
    pub remote_dir: Option<PathBuf>,
}

fn default_interval_secs() -> u64 {
    15
}

fn default_reconnect_secs() -> u64 {
    3
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            reconnect_delay_secs: default_reconnect_secs(),
            remote_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from a `fabtrack.toml` file
    pub fn load(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|err| Error::InvalidConfig(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory. A missing file means
    /// defaults; a present but broken file is an error, never silently
    /// replaced by defaults.
    pub fn load_from_dir(dir: &PathBuf) -> Result<Self> {
        let config_path = dir.join("fabtrack.toml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolved snapshot cache path, relative to the working directory
    /// when not configured
    pub fn cache_path(&self, dir: &Path) -> PathBuf {
        self.paths
            .cache_file
            .clone()
            .unwrap_or_else(|| dir.join("cache.json"))
    }

    /// Resolved catalog path, relative to the working directory when not
    /// configured
    pub fn catalog_path(&self, dir: &Path) -> PathBuf {
        self.paths
            .catalog_file
            .clone()
            .unwrap_or_else(|| dir.join("catalog.json"))
    }

    fn validate(&self) -> Result<()> {
        if self.user.id.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "user.id cannot be empty".to_string(),
            ));
        }
        if builtin_fabrics()
            .iter()
            .all(|fabric| fabric.id != self.default_fabric)
        {
            return Err(Error::InvalidConfig(format!(
                "default_fabric '{}' is not a known fabric",
                self.default_fabric
            )));
        }
        if self.sync.interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "sync.interval_secs must be > 0".to_string(),
            ));
        }
        if self.sync.reconnect_delay_secs == 0 {
            return Err(Error::InvalidConfig(
                "sync.reconnect_delay_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
