//! Hand-written doubles for the playback traits, shared by the unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::dispatch::{DeviceEventSink, EngineEventSink, SessionId};
use super::status::PlaybackStatus;
use super::traits::{
    DeviceError, DeviceEvent, EngineEvent, EngineFactory, EngineOptions, PlaybackDevice,
    StreamingEngine,
};
use crate::events::{EventEmitter, PlayerEvent, StationEvent};

/// Yields enough times for spawned tasks on the test runtime to make progress.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Device
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct MockDeviceState {
    source: Option<String>,
    playing: bool,
    gain: f32,
    sink: Option<DeviceEventSink>,
    unloads: usize,
    plays: usize,
}

/// Playback device that records commands and emits events on demand.
pub struct MockDevice {
    native: bool,
    state: Mutex<MockDeviceState>,
    reject_play: AtomicBool,
    hold_play: AtomicBool,
    release: Notify,
}

impl MockDevice {
    fn build(native: bool) -> Arc<Self> {
        Arc::new(Self {
            native,
            state: Mutex::new(MockDeviceState::default()),
            reject_play: AtomicBool::new(false),
            hold_play: AtomicBool::new(false),
            release: Notify::new(),
        })
    }

    /// A device without native HLS support.
    pub fn new() -> Arc<Self> {
        Self::build(false)
    }

    /// A device that plays HLS natively.
    pub fn native() -> Arc<Self> {
        Self::build(true)
    }

    pub fn source(&self) -> Option<String> {
        self.state.lock().source.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    pub fn gain(&self) -> f32 {
        self.state.lock().gain
    }

    pub fn unload_count(&self) -> usize {
        self.state.lock().unloads
    }

    pub fn play_count(&self) -> usize {
        self.state.lock().plays
    }

    /// Makes the next `play()` fail.
    pub fn reject_next_play(&self) {
        self.reject_play.store(true, Ordering::SeqCst);
    }

    /// Makes the next `play()` wait until [`release_play`](Self::release_play).
    pub fn hold_next_play(&self) {
        self.hold_play.store(true, Ordering::SeqCst);
    }

    pub fn release_play(&self) {
        self.release.notify_one();
    }

    /// Raises a device event through the subscribed sink.
    pub fn emit(&self, event: DeviceEvent) {
        let sink = self.state.lock().sink.clone();
        if let Some(sink) = sink {
            sink.send(event);
        }
    }
}

#[async_trait]
impl PlaybackDevice for MockDevice {
    fn load_source(&self, url: &str) {
        self.state.lock().source = Some(url.to_string());
    }

    fn unload(&self) {
        let mut state = self.state.lock();
        state.source = None;
        state.playing = false;
        state.unloads += 1;
    }

    async fn play(&self) -> Result<(), DeviceError> {
        self.state.lock().plays += 1;
        if self.hold_play.swap(false, Ordering::SeqCst) {
            self.release.notified().await;
        }
        if self.reject_play.swap(false, Ordering::SeqCst) {
            return Err(DeviceError::Rejected("autoplay blocked".into()));
        }
        self.state.lock().playing = true;
        Ok(())
    }

    fn pause(&self) {
        self.state.lock().playing = false;
    }

    fn set_volume(&self, level: f32) {
        self.state.lock().gain = level;
    }

    fn volume(&self) -> f32 {
        self.state.lock().gain
    }

    fn supports_native_streaming(&self) -> bool {
        self.native
    }

    fn subscribe(&self, sink: DeviceEventSink) {
        self.state.lock().sink = Some(sink);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// A call made on a mock engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    LoadSource(String),
    AttachDevice,
    RetryLoad,
    RecoverMedia,
    Destroy,
}

/// Test-side view of one engine instance created by [`MockEngineFactory`].
#[derive(Clone)]
pub struct EngineHandle {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    events: EngineEventSink,
}

impl EngineHandle {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn emit(&self, event: EngineEvent) {
        self.events.send(event);
    }

    pub fn session(&self) -> SessionId {
        self.events.session()
    }
}

struct MockEngine {
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl StreamingEngine for MockEngine {
    fn load_source(&mut self, url: &str) {
        self.calls.lock().push(EngineCall::LoadSource(url.to_string()));
    }

    fn attach_device(&mut self, _device: Arc<dyn PlaybackDevice>) {
        self.calls.lock().push(EngineCall::AttachDevice);
    }

    fn retry_load(&mut self) {
        self.calls.lock().push(EngineCall::RetryLoad);
    }

    fn recover_media_error(&mut self) {
        self.calls.lock().push(EngineCall::RecoverMedia);
    }

    fn destroy(&mut self) {
        self.calls.lock().push(EngineCall::Destroy);
    }
}

/// Engine factory that hands out recording engines.
pub struct MockEngineFactory {
    supported: bool,
    created: Mutex<Vec<EngineHandle>>,
}

impl MockEngineFactory {
    pub fn supported() -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            created: Mutex::new(Vec::new()),
        })
    }

    pub fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            supported: false,
            created: Mutex::new(Vec::new()),
        })
    }

    /// Returns the `index`-th engine created. Panics if it does not exist.
    pub fn engine(&self, index: usize) -> EngineHandle {
        self.created.lock()[index].clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }
}

impl EngineFactory for MockEngineFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(
        &self,
        _options: &EngineOptions,
        events: EngineEventSink,
    ) -> Box<dyn StreamingEngine> {
        let calls = Arc::new(Mutex::new(Vec::new()));
        self.created.lock().push(EngineHandle {
            calls: Arc::clone(&calls),
            events,
        });
        Box::new(MockEngine { calls })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Emitter
// ─────────────────────────────────────────────────────────────────────────────

/// Emitter that keeps every event for inspection.
#[derive(Default)]
pub struct RecordingEmitter {
    player: Mutex<Vec<PlayerEvent>>,
    station: Mutex<Vec<StationEvent>>,
}

impl RecordingEmitter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn player_events(&self) -> Vec<PlayerEvent> {
        self.player.lock().clone()
    }

    pub fn station_events(&self) -> Vec<StationEvent> {
        self.station.lock().clone()
    }

    /// Target states of every `StatusChanged` event, in order.
    pub fn statuses(&self) -> Vec<PlaybackStatus> {
        self.player
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlayerEvent::StatusChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    pub fn fault_cleared_count(&self) -> usize {
        self.player
            .lock()
            .iter()
            .filter(|e| matches!(e, PlayerEvent::FaultCleared { .. }))
            .count()
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit_player(&self, event: PlayerEvent) {
        self.player.lock().push(event);
    }

    fn emit_station(&self, event: StationEvent) {
        self.station.lock().push(event);
    }
}
