//! Configuration module for mediabridge-rs
//!
//! A single [`BridgeConfig`] is applied once, at `init_with_config`. It can be
//! persisted as JSON in the platform config directory:
//!
//! - **Linux**: `~/.config/dev.mediabridge.mediabridge-rs/config.json`
//! - **macOS**: `~/Library/Application Support/dev.mediabridge.mediabridge-rs/config.json`
//! - **Windows**: `%APPDATA%\dev.mediabridge.mediabridge-rs\config.json`
//!
//! # Example
//!
//! ```ignore
//! use mediabridge_rs::config::{BridgeConfig, RewatchPolicy};
//!
//! let mut config = BridgeConfig::load_or_default();
//! config.bus.rewatch_policy = RewatchPolicy::Reject;
//! mediabridge_rs::init_with_config(config);
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.mediabridge.mediabridge-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.json";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Complete configuration for the bridge and its engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub engine: EngineConfig,
    pub bus: BusConfig,
    pub diagnostics: DiagnosticsConfig,
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            BridgeError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save to a file, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    BridgeError::Config(format!("Failed to create {}: {}", dir.display(), e))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| BridgeError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            BridgeError::Config(format!("Failed to write {}: {}", path.display(), e))
        })
    }
}
