use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::browser::GroupColor;
use crate::util::paths::config_path;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Number of undo batches kept by default
pub const DEFAULT_UNDO_CAPACITY: usize = 30;

/// Recently-closed sessions within this window of the newest are restored together
pub const DEFAULT_RESTORE_WINDOW_MS: i64 = 5_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Maximum number of undo batches retained
    pub undo_capacity: usize,
    /// Recency window for the recently-closed fallback of undo
    pub restore_window_ms: i64,
    /// Colour of groups created by group-by-host
    pub group_color: GroupColor,
    /// Limit used by close-inactive when the caller gives none
    pub default_inactive_limit: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            undo_capacity: DEFAULT_UNDO_CAPACITY,
            restore_window_ms: DEFAULT_RESTORE_WINDOW_MS,
            group_color: GroupColor::Blue,
            default_inactive_limit: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlUndoConfig {
    pub capacity: Option<usize>,
    pub restore_window_ms: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlGroupingConfig {
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlInactiveConfig {
    pub default_limit_minutes: Option<u64>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub undo: Option<TomlUndoConfig>,
    pub grouping: Option<TomlGroupingConfig>,
    pub inactive: Option<TomlInactiveConfig>,
}

impl Config {
    /// Load configuration from the default file, merging with defaults.
    ///
    /// A missing file is created from the bundled example; an unreadable or
    /// invalid one is logged and ignored.
    pub fn load() -> Self {
        let config_file = config_path();

        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        match Self::load_from(&config_file) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Using default configuration");
                Config::default()
            }
        }
    }

    /// Load configuration from a specific file, merging with defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let toml_config =
            toml::from_str::<TomlConfig>(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Config::default().merge(toml_config))
    }

    fn merge(mut self, toml_config: TomlConfig) -> Self {
        if let Some(undo) = toml_config.undo {
            if let Some(capacity) = undo.capacity.filter(|c| *c > 0) {
                self.undo_capacity = capacity;
            }
            if let Some(window) = undo.restore_window_ms.filter(|w| *w >= 0) {
                self.restore_window_ms = window;
            }
        }

        if let Some(grouping) = toml_config.grouping {
            if let Some(color) = grouping.color {
                self.group_color = GroupColor::parse(&color);
            }
        }

        if let Some(inactive) = toml_config.inactive {
            if let Some(minutes) = inactive.default_limit_minutes.filter(|m| *m > 0) {
                self.default_inactive_limit = Duration::from_secs(minutes * 60);
            }
        }

        self
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(error = %e, "Failed to create config directory");
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(error = %e, "Failed to write default config");
        }
    }

    pub fn with_undo_capacity(mut self, capacity: usize) -> Self {
        self.undo_capacity = capacity;
        self
    }

    pub fn with_restore_window_ms(mut self, window_ms: i64) -> Self {
        self.restore_window_ms = window_ms;
        self
    }

    pub fn with_group_color(mut self, color: GroupColor) -> Self {
        self.group_color = color;
        self
    }
}
