//! CLI configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tuner_core::{EngineOptions, PlayerConfig};

/// CLI configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Station catalog endpoint.
    /// Override: `TUNER_CATALOG_URL`
    pub catalog_url: String,

    /// Directory for persistent data (last selected station).
    /// Override: `TUNER_DATA_DIR`
    pub data_dir: Option<PathBuf>,

    /// Initial volume (0-100).
    /// Override: `TUNER_VOLUME`
    pub volume: u8,

    /// Station used when nothing has been saved.
    pub default_station: String,

    /// Seconds a fault message stays visible.
    pub fault_display_secs: u64,

    /// Prefer the live edge over buffer depth.
    pub low_latency: bool,

    /// Seconds of played media kept behind the playhead.
    pub back_buffer_secs: u32,
}

impl Default for CliConfig {
    fn default() -> Self {
        let core = PlayerConfig::default();
        Self {
            catalog_url: core.catalog_url,
            data_dir: None,
            volume: core.default_volume,
            default_station: core.default_station_code,
            fault_display_secs: core.fault_display_secs,
            low_latency: core.engine.low_latency,
            back_buffer_secs: core.engine.back_buffer_secs,
        }
    }
}

impl CliConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TUNER_CATALOG_URL") {
            if !val.trim().is_empty() {
                self.catalog_url = val;
            }
        }

        if let Ok(val) = std::env::var("TUNER_VOLUME") {
            if let Ok(volume) = val.parse::<u8>() {
                self.volume = volume.min(100);
            }
        }

        // Note: TUNER_DATA_DIR is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to tuner-core's config type.
    pub fn to_core_config(&self) -> PlayerConfig {
        PlayerConfig {
            default_volume: self.volume.min(100),
            fault_display_secs: self.fault_display_secs,
            engine: EngineOptions {
                low_latency: self.low_latency,
                back_buffer_secs: self.back_buffer_secs,
                ..EngineOptions::default()
            },
            catalog_url: self.catalog_url.clone(),
            default_station_code: self.default_station.clone(),
            ..PlayerConfig::default()
        }
    }
}
