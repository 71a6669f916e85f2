//! Tuner Core - shared library for the live radio tuner.
//!
//! This crate attaches a continuous HLS audio stream to a playback device,
//! recovers from transient stream faults, and exposes a five-state playback
//! status to whatever front-end drives it.
//!
//! # Architecture
//!
//! - [`playback`]: Device adapter, stream sessions, recovery policy, status
//!   machine and the [`PlayerController`] command surface
//! - [`station`]: Station catalog client, persisted selection and directory
//! - [`events`]: Event system for front-end notification
//! - [`runtime`]: Task spawning abstraction for async runtime independence
//! - [`state`]: Player configuration
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`PlaybackDevice`](playback::PlaybackDevice): The audio sink
//! - [`EngineFactory`](playback::EngineFactory) /
//!   [`StreamingEngine`](playback::StreamingEngine): Adaptive streaming
//! - [`StationCatalog`](station::StationCatalog): Where stations come from
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks

#![warn(clippy::all)]

pub mod bootstrap;
pub mod error;
pub mod events;
pub mod playback;
pub mod protocol_constants;
pub mod runtime;
pub mod state;
pub mod station;
pub mod utils;

// Re-export commonly used types at the crate root
pub use error::{ErrorCode, PlaybackFault, TunerError, TunerResult};
pub use events::{
    BroadcastEvent, BroadcastEventBridge, EventEmitter, LoggingEventEmitter, NoopEventEmitter,
    PlayerEvent, StationEvent,
};
pub use playback::{
    DeviceError, DeviceEvent, DeviceEventSink, EngineEvent, EngineEventSink, EngineFactory,
    EngineFault, EngineOptions, FaultKind, FaultRecord, PlaybackDevice, PlaybackStatus,
    PlayerController, PlayerSnapshot, StreamDescriptor, StreamingEngine, Volume,
};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::PlayerConfig;
pub use station::{HttpStationCatalog, LastStationStore, Station, StationCatalog, StationDirectory};
pub use utils::{normalize_station_code, now_millis};

// Re-export bootstrap types
pub use bootstrap::{
    bootstrap_player, bootstrap_player_with_catalog, BootstrappedPlayer, PlayerBackends,
};
