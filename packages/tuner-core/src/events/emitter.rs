//! Event emitter abstraction for decoupling the player from transport.
//!
//! The controller and the station directory depend on the [`EventEmitter`]
//! trait rather than concrete broadcast channels, enabling testing and
//! alternative front-ends.

use super::{PlayerEvent, StationEvent};

/// Trait for emitting domain events without knowledge of transport.
///
/// Emitters are called after the controller has released its internal lock,
/// so an implementation may read controller state. It must not block.
pub trait EventEmitter: Send + Sync {
    /// Emits a player event.
    fn emit_player(&self, event: PlayerEvent);

    /// Emits a station event.
    fn emit_station(&self, event: StationEvent);
}

/// No-op emitter. Events are silently discarded.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_player(&self, _event: PlayerEvent) {}

    fn emit_station(&self, _event: StationEvent) {}
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_player(&self, event: PlayerEvent) {
        tracing::debug!(?event, "player_event");
    }

    fn emit_station(&self, event: StationEvent) {
        tracing::debug!(?event, "station_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Test emitter that counts events.
    struct CountingEventEmitter {
        player_count: AtomicUsize,
        station_count: AtomicUsize,
    }

    impl EventEmitter for CountingEventEmitter {
        fn emit_player(&self, _event: PlayerEvent) {
            self.player_count.fetch_add(1, Ordering::SeqCst);
        }

        fn emit_station(&self, _event: StationEvent) {
            self.station_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn counting_emitter_tracks_events() {
        let emitter = Arc::new(CountingEventEmitter {
            player_count: AtomicUsize::new(0),
            station_count: AtomicUsize::new(0),
        });
        let dyn_emitter: Arc<dyn EventEmitter> = emitter.clone();

        dyn_emitter.emit_player(PlayerEvent::FaultCleared { timestamp: 0 });
        dyn_emitter.emit_player(PlayerEvent::VolumeChanged {
            volume: 10,
            timestamp: 0,
        });
        dyn_emitter.emit_station(StationEvent::CatalogLoaded {
            count: 3,
            fallback: false,
            timestamp: 0,
        });

        assert_eq!(emitter.player_count.load(Ordering::SeqCst), 2);
        assert_eq!(emitter.station_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn noop_and_logging_emitters_accept_events() {
        NoopEventEmitter.emit_player(PlayerEvent::FaultCleared { timestamp: 0 });
        LoggingEventEmitter.emit_station(StationEvent::CatalogLoaded {
            count: 0,
            fallback: true,
            timestamp: 0,
        });
    }
}
