//! Playback device with no audio output.
//!
//! Acknowledges every command and reports `playing`/`pause` the way a real
//! device would, so the controller's status machine can be driven from a
//! terminal.

use async_trait::async_trait;
use parking_lot::Mutex;
use tuner_core::{DeviceError, DeviceEvent, DeviceEventSink, PlaybackDevice};

#[derive(Default)]
struct HeadlessState {
    source: Option<String>,
    playing: bool,
    gain: f32,
    sink: Option<DeviceEventSink>,
}

#[derive(Default)]
pub struct HeadlessDevice {
    state: Mutex<HeadlessState>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(&self, event: DeviceEvent) {
        let sink = self.state.lock().sink.clone();
        if let Some(sink) = sink {
            sink.send(event);
        }
    }
}

#[async_trait]
impl PlaybackDevice for HeadlessDevice {
    fn load_source(&self, url: &str) {
        self.state.lock().source = Some(url.to_string());
    }

    fn unload(&self) {
        let was_playing = {
            let mut state = self.state.lock();
            state.source = None;
            std::mem::replace(&mut state.playing, false)
        };
        if was_playing {
            self.notify(DeviceEvent::Pause);
        }
    }

    async fn play(&self) -> Result<(), DeviceError> {
        self.state.lock().playing = true;
        log::debug!("[Headless] play");
        self.notify(DeviceEvent::Playing);
        Ok(())
    }

    fn pause(&self) {
        let was_playing = std::mem::replace(&mut self.state.lock().playing, false);
        log::debug!("[Headless] pause");
        if was_playing {
            self.notify(DeviceEvent::Pause);
        }
    }

    fn set_volume(&self, level: f32) {
        self.state.lock().gain = level.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.state.lock().gain
    }

    fn supports_native_streaming(&self) -> bool {
        false
    }

    fn subscribe(&self, sink: DeviceEventSink) {
        self.state.lock().sink = Some(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn play_and_pause_toggle_state() {
        let device = HeadlessDevice::new();

        device.play().await.expect("play");
        assert!(device.state.lock().playing);

        device.pause();
        assert!(!device.state.lock().playing);
    }

    #[test]
    fn gain_is_clamped() {
        let device = HeadlessDevice::new();
        device.set_volume(3.0);
        assert_eq!(device.volume(), 1.0);
    }
}
