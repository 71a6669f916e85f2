//! Playback device adapter and volume model.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::dispatch::DeviceEventSink;
use super::traits::{DeviceError, PlaybackDevice};

/// User-facing volume on a 0-100 scale.
///
/// Construction clamps, so a `Volume` is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Volume(u8);

impl Volume {
    /// Loudest setting.
    pub const MAX: Volume = Volume(100);
    /// Silence.
    pub const MUTED: Volume = Volume(0);

    /// Creates a volume, clamping `percent` into 0..=100.
    pub fn clamped(percent: i64) -> Self {
        Self(percent.clamp(0, 100) as u8)
    }

    /// Returns the volume as a percentage.
    pub fn percent(self) -> u8 {
        self.0
    }

    /// Returns the device gain for this volume (0.0..=1.0).
    pub fn as_gain(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    /// Converts a device gain back to the nearest volume step.
    pub fn from_gain(gain: f32) -> Self {
        if gain.is_nan() {
            return Self::MUTED;
        }
        Self::clamped((gain * 100.0).round() as i64)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Uniform control surface over the host's playback device.
///
/// The adapter owns nothing but a handle; it exists so the controller and
/// the session manager speak in [`Volume`] and log consistently regardless
/// of backend.
#[derive(Clone)]
pub struct DeviceAdapter {
    device: Arc<dyn PlaybackDevice>,
}

impl DeviceAdapter {
    pub fn new(device: Arc<dyn PlaybackDevice>) -> Self {
        Self { device }
    }

    /// Returns the underlying device handle (for binding an engine).
    pub fn handle(&self) -> Arc<dyn PlaybackDevice> {
        Arc::clone(&self.device)
    }

    pub fn load_source(&self, url: &str) {
        log::debug!("[Device] Loading native source {}", url);
        self.device.load_source(url);
    }

    pub fn unload(&self) {
        self.device.unload();
    }

    pub async fn play(&self) -> Result<(), DeviceError> {
        self.device.play().await
    }

    pub fn pause(&self) {
        self.device.pause();
    }

    /// Mirrors `volume` onto the device gain.
    pub fn apply_volume(&self, volume: Volume) {
        self.device.set_volume(volume.as_gain());
    }

    /// Reads the device gain back as a volume.
    pub fn volume(&self) -> Volume {
        Volume::from_gain(self.device.volume())
    }

    pub fn supports_native_streaming(&self) -> bool {
        self.device.supports_native_streaming()
    }

    pub fn subscribe(&self, sink: DeviceEventSink) {
        self.device.subscribe(sink);
    }
}
