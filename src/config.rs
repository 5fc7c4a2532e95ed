//! Configuration management for Carelog
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{CarelogError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Carelog
///
/// This structure holds all configuration needed for the conversation
/// store, including storage capacity, history bounds, and autosave
/// behavior.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Blob storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Conversation history bounds
    #[serde(default)]
    pub history: HistoryConfig,

    /// Autosave scheduler configuration
    #[serde(default)]
    pub autosave: AutosaveConfig,
}

/// Blob storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the embedded database; platform data dir when unset
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Maximum bytes the store may occupy
    #[serde(default = "default_capacity_bytes")]
    pub capacity_bytes: u64,
}

fn default_capacity_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            capacity_bytes: default_capacity_bytes(),
        }
    }
}

/// Conversation history bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of stored conversations before eviction
    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,

    /// Maximum messages persisted per conversation (most recent retained)
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Maximum characters in a derived title
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,

    /// Maximum characters in a derived summary preview
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,

    /// Maximum derived tags per conversation
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,
}

fn default_max_conversations() -> usize {
    50
}

fn default_max_messages() -> usize {
    100
}

fn default_title_max_chars() -> usize {
    50
}

fn default_summary_max_chars() -> usize {
    120
}

fn default_max_tags() -> usize {
    5
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_conversations: default_max_conversations(),
            max_messages: default_max_messages(),
            title_max_chars: default_title_max_chars(),
            summary_max_chars: default_summary_max_chars(),
            max_tags: default_max_tags(),
        }
    }
}

/// Autosave scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Idle seconds after the last mutation before a commit fires
    #[serde(default = "default_debounce_seconds")]
    pub debounce_seconds: u64,
}

fn default_debounce_seconds() -> u64 {
    2
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_seconds: default_debounce_seconds(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CarelogError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CarelogError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(data_dir) = std::env::var(crate::store::DATA_DIR_ENV) {
            self.storage.data_dir = Some(data_dir);
        }

        if let Ok(capacity) = std::env::var("CARELOG_CAPACITY_BYTES") {
            if let Ok(value) = capacity.parse() {
                self.storage.capacity_bytes = value;
            } else {
                tracing::warn!("Invalid CARELOG_CAPACITY_BYTES: {}", capacity);
            }
        }

        if let Ok(max) = std::env::var("CARELOG_MAX_CONVERSATIONS") {
            if let Ok(value) = max.parse() {
                self.history.max_conversations = value;
            } else {
                tracing::warn!("Invalid CARELOG_MAX_CONVERSATIONS: {}", max);
            }
        }

        if let Ok(debounce) = std::env::var("CARELOG_DEBOUNCE_SECONDS") {
            if let Ok(value) = debounce.parse() {
                self.autosave.debounce_seconds = value;
            } else {
                tracing::warn!("Invalid CARELOG_DEBOUNCE_SECONDS: {}", debounce);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(data_dir) = &cli.data_dir {
            self.storage.data_dir = Some(data_dir.clone());
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.storage.capacity_bytes == 0 {
            return Err(CarelogError::Config(
                "storage.capacity_bytes must be greater than 0".to_string(),
            )
            .into());
        }

        if self.history.max_conversations == 0 {
            return Err(CarelogError::Config(
                "history.max_conversations must be greater than 0".to_string(),
            )
            .into());
        }

        if self.history.max_messages == 0 {
            return Err(CarelogError::Config(
                "history.max_messages must be greater than 0".to_string(),
            )
            .into());
        }

        if self.history.title_max_chars < 4 {
            return Err(CarelogError::Config(
                "history.title_max_chars must be at least 4".to_string(),
            )
            .into());
        }

        if self.history.max_tags == 0 {
            return Err(
                CarelogError::Config("history.max_tags must be greater than 0".to_string()).into(),
            );
        }

        Ok(())
    }
}
