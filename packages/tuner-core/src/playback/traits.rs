//! Trait abstractions for the playback device and the adaptive-streaming engine.
//!
//! The controller depends on these traits rather than on a concrete audio
//! backend. Hosts provide implementations (a browser element, a native
//! decoder, a headless probe) and tests provide mocks.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::dispatch::{DeviceEventSink, EngineEventSink};

/// Events reported by the playback device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceEvent {
    /// The device stalled waiting for data.
    Waiting,
    /// The device is producing audio.
    Playing,
    /// The device stopped producing audio.
    Pause,
}

/// Errors returned by the playback device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The device refused to start (autoplay policy, missing user gesture).
    #[error("Playback rejected by device: {0}")]
    Rejected(String),

    /// The device has gone away or cannot accept commands.
    #[error("Device unavailable: {0}")]
    Unavailable(String),
}

/// The sink that produces audible output.
///
/// Exactly one device exists per controller. Implementations report
/// `waiting`, `playing` and `pause` through the sink handed to
/// [`subscribe`](PlaybackDevice::subscribe).
#[async_trait]
pub trait PlaybackDevice: Send + Sync {
    /// Points the device directly at a stream URL (native path).
    fn load_source(&self, url: &str);

    /// Stops output and detaches whatever source is bound.
    fn unload(&self);

    /// Requests playback. Resolves once the device has accepted or rejected it.
    async fn play(&self) -> Result<(), DeviceError>;

    /// Pauses output.
    fn pause(&self);

    /// Sets the output gain (0.0..=1.0).
    fn set_volume(&self, level: f32);

    /// Returns the current output gain (0.0..=1.0).
    fn volume(&self) -> f32;

    /// Returns true when the device can play HLS playlists without an engine.
    fn supports_native_streaming(&self) -> bool;

    /// Registers the sink that receives device events.
    fn subscribe(&self, sink: DeviceEventSink);
}

/// Classification of an engine fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FaultKind {
    /// Playlist or segment loading failed.
    Network,
    /// Decoding or buffering failed.
    Media,
    /// Container demuxing failed.
    Mux,
    /// DRM key negotiation failed.
    KeySystem,
    /// Anything the engine could not classify.
    Other,
}

/// A fault reported by the streaming engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineFault {
    /// The engine considers this fault unrecoverable without intervention.
    pub fatal: bool,
    /// What went wrong.
    pub kind: FaultKind,
    /// Engine-specific detail (e.g. `manifestLoadError`).
    pub detail: String,
}

impl EngineFault {
    /// Creates a fatal fault.
    pub fn fatal(kind: FaultKind, detail: impl Into<String>) -> Self {
        Self {
            fatal: true,
            kind,
            detail: detail.into(),
        }
    }

    /// Creates a non-fatal fault.
    pub fn transient(kind: FaultKind, detail: impl Into<String>) -> Self {
        Self {
            fatal: false,
            kind,
            detail: detail.into(),
        }
    }
}

/// Events reported by a streaming engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The playlist was fetched and parsed; the stream is playable.
    ManifestParsed,
    /// A fault occurred.
    Fault(EngineFault),
}

/// Options applied to each engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineOptions {
    /// Prefer the live edge over buffer depth.
    pub low_latency: bool,
    /// Seconds of already-played media kept behind the playhead.
    pub back_buffer_secs: u32,
    /// Allow the engine to offload demuxing to a worker.
    pub enable_worker: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            low_latency: true,
            back_buffer_secs: 90,
            enable_worker: true,
        }
    }
}

/// An adaptive-streaming engine instance bound to a single stream.
///
/// Instances are owned exclusively by one session and destroyed with it.
pub trait StreamingEngine: Send {
    /// Starts loading the playlist at `url`.
    fn load_source(&mut self, url: &str);

    /// Binds the engine's output to the device.
    fn attach_device(&mut self, device: Arc<dyn PlaybackDevice>);

    /// Restarts loading after a network failure.
    fn retry_load(&mut self);

    /// Rebuilds the media pipeline after a decode failure.
    fn recover_media_error(&mut self);

    /// Stops all activity and releases the device binding.
    ///
    /// Must be idempotent.
    fn destroy(&mut self);
}

/// Creates streaming engine instances.
pub trait EngineFactory: Send + Sync {
    /// Returns true when an engine can run in this environment.
    fn is_supported(&self) -> bool;

    /// Creates a new engine that reports through `events`.
    fn create(&self, options: &EngineOptions, events: EngineEventSink) -> Box<dyn StreamingEngine>;
}

/// Engine factory for environments without an adaptive-streaming engine.
///
/// Attachment falls back to native device support, or fails as unsupported.
pub struct NoEngineFactory;

impl EngineFactory for NoEngineFactory {
    fn is_supported(&self) -> bool {
        false
    }

    fn create(
        &self,
        _options: &EngineOptions,
        _events: EngineEventSink,
    ) -> Box<dyn StreamingEngine> {
        Box::new(InertEngine)
    }
}

/// Engine that does nothing. Only reachable through a misbehaving caller of
/// [`NoEngineFactory::create`].
struct InertEngine;

impl StreamingEngine for InertEngine {
    fn load_source(&mut self, _url: &str) {}
    fn attach_device(&mut self, _device: Arc<dyn PlaybackDevice>) {}
    fn retry_load(&mut self) {}
    fn recover_media_error(&mut self) {}
    fn destroy(&mut self) {}
}
