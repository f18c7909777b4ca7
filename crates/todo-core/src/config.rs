//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/todo/config.toml, TODO_CONFIG, or --config)
//! 3. Environment variables (TODO_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable prefix
const ENV_PREFIX: &str = "TODO";

/// Default store file name inside the data directory
const DEFAULT_DB_FILE: &str = "todolist.db";

/// Default outer bucket name
const DEFAULT_ROOT_BUCKET: &str = "DB";

/// Default items bucket name (nested inside the root bucket)
const DEFAULT_ITEMS_BUCKET: &str = "ITEMS";

/// Bucket names used by the item gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Outer bucket
    pub root_bucket: String,
    /// Items bucket, nested inside `root_bucket`
    pub items_bucket: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            root_bucket: DEFAULT_ROOT_BUCKET.to_string(),
            items_bucket: DEFAULT_ITEMS_BUCKET.to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the store file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Store file name, relative to `data_dir`
    #[serde(default = "default_db_file")]
    pub db_file: String,

    /// Outer bucket name
    #[serde(default = "default_root_bucket")]
    pub root_bucket: String,

    /// Items bucket name
    #[serde(default = "default_items_bucket")]
    pub items_bucket: String,

    /// Log file path (logs go to stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_file: default_db_file(),
            root_bucket: default_root_bucket(),
            items_bucket: default_items_bucket(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (TODO_DATA_DIR, TODO_DB_FILE, TODO_LOG_FILE)
    /// 2. Config file (~/.config/todo/config.toml or TODO_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(cli_path: Option<&PathBuf>) -> Result<Self> {
        match cli_path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_DB_FILE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.db_file = val;
            }
        }

        // Empty string clears it
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with TODO_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("todo")
            .join("config.toml")
    }

    /// Get the path to the store file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    /// Get the bucket layout
    pub fn layout(&self) -> Layout {
        Layout {
            root_bucket: self.root_bucket.clone(),
            items_bucket: self.items_bucket.clone(),
        }
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("todo")
}

fn default_db_file() -> String {
    DEFAULT_DB_FILE.to_string()
}

fn default_root_bucket() -> String {
    DEFAULT_ROOT_BUCKET.to_string()
}

fn default_items_bucket() -> String {
    DEFAULT_ITEMS_BUCKET.to_string()
}
