//! Core player configuration.

use serde::{Deserialize, Serialize};

use crate::playback::EngineOptions;
use crate::protocol_constants::DEFAULT_STATION_CODE;

/// Configuration for the player controller and its collaborators.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Volume applied before the user touches the slider (0-100).
    pub default_volume: u8,

    /// How long a fault record stays visible before it clears itself (seconds).
    pub fault_display_secs: u64,

    /// Options handed to every adaptive-streaming engine instance.
    pub engine: EngineOptions,

    /// Capacity of the broadcast channel used for player and station events.
    pub event_channel_capacity: usize,

    /// Station catalog endpoint (`GET <url>` lists, `GET <url>/<code>` fetches one).
    pub catalog_url: String,

    /// Station selected when nothing has been persisted.
    pub default_station_code: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: 70,
            fault_display_secs: 5,
            engine: EngineOptions::default(),
            event_channel_capacity: 100,
            catalog_url: "http://localhost:8081/api/stations".to_string(),
            default_station_code: DEFAULT_STATION_CODE.to_string(),
        }
    }
}

impl PlayerConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_volume > 100 {
            return Err(format!(
                "default_volume must be within 0..=100 (got {})",
                self.default_volume
            ));
        }
        if self.fault_display_secs == 0 {
            return Err("fault_display_secs must be >= 1".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        if self.catalog_url.trim().is_empty() {
            return Err("catalog_url must not be empty".to_string());
        }
        if self.default_station_code.trim().is_empty() {
            return Err("default_station_code must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_volume, 70);
        assert_eq!(config.fault_display_secs, 5);
        assert!(config.engine.low_latency);
        assert_eq!(config.engine.back_buffer_secs, 90);
    }

    #[test]
    fn rejects_out_of_range_volume() {
        let config = PlayerConfig {
            default_volume: 101,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_channel_capacity() {
        let config = PlayerConfig {
            event_channel_capacity: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("event_channel_capacity"));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: PlayerConfig =
            serde_json::from_str(r#"{"defaultVolume": 40, "engine": {"lowLatency": false}}"#)
                .expect("parse");
        assert_eq!(config.default_volume, 40);
        assert!(!config.engine.low_latency);
        assert_eq!(config.engine.back_buffer_secs, 90);
        assert_eq!(config.fault_display_secs, 5);
    }
}
