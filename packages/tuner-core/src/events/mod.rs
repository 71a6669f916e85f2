//! Event system for front-end notification.
//!
//! This module provides:
//! - [`EventEmitter`] trait for the controller and station directory to emit events
//! - [`BroadcastEventBridge`] for fan-out over a tokio broadcast channel
//! - Event types for the player and the station catalog

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::playback::{FaultRecord, PlaybackStatus, SessionMode};

/// Events broadcast to front-ends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Events from the player controller.
    Player(PlayerEvent),

    /// Events from the station directory.
    Station(StationEvent),
}

/// Events related to playback state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    /// The playback status changed.
    StatusChanged {
        from: PlaybackStatus,
        to: PlaybackStatus,
        /// Display label of the new status.
        label: &'static str,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A fault record became visible.
    FaultRaised { record: FaultRecord },
    /// The visible fault record expired or was dismissed.
    FaultCleared {
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A stream session was bound to the device.
    SessionAttached {
        #[serde(rename = "sessionId")]
        session_id: u64,
        #[serde(rename = "streamUrl")]
        stream_url: String,
        mode: SessionMode,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A stream session was torn down.
    SessionReleased {
        #[serde(rename = "sessionId")]
        session_id: u64,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The user volume changed.
    VolumeChanged {
        volume: u8,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Events related to the station catalog and selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StationEvent {
    /// The catalog was loaded.
    CatalogLoaded {
        count: usize,
        /// True when the built-in fallback list was used.
        fallback: bool,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The current station changed.
    Selected {
        code: String,
        name: String,
        #[serde(rename = "streamUrl")]
        stream_url: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_event_wire_shape() {
        let event = BroadcastEvent::Player(PlayerEvent::StatusChanged {
            from: PlaybackStatus::Ready,
            to: PlaybackStatus::Live,
            label: PlaybackStatus::Live.label(),
            timestamp: 1,
        });

        let json = serde_json::to_value(&event).expect("serialize");

        assert_eq!(json["category"], "player");
        assert_eq!(json["type"], "statusChanged");
        assert_eq!(json["to"], "live");
        assert_eq!(json["label"], "LIVE");
    }

    #[test]
    fn session_events_use_camel_case_fields() {
        let event = PlayerEvent::SessionAttached {
            session_id: 4,
            stream_url: "https://radio.example/live.m3u8".into(),
            mode: SessionMode::Native,
            timestamp: 0,
        };

        let json = serde_json::to_value(&event).expect("serialize");

        assert_eq!(json["sessionId"], 4);
        assert_eq!(json["mode"], "native");
        assert!(json.get("stream_url").is_none());
    }
}
