//! Five-state playback status machine.

use std::fmt;

use serde::Serialize;

/// Externally observable playback status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// No stream is bound, or a new one is being bound.
    #[default]
    Offline,
    /// The stream is playable but not playing.
    Ready,
    /// Playback is wanted but the device is starved.
    Loading,
    /// Audio is flowing.
    Live,
    /// The session failed; only a fresh attach leaves this state.
    Error,
}

impl PlaybackStatus {
    /// Label shown next to the status indicator.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Offline => "Offline",
            Self::Ready => "Ready to Play",
            Self::Loading => "Loading...",
            Self::Live => "LIVE",
            Self::Error => "Error",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Ready => "ready",
            Self::Loading => "loading",
            Self::Live => "live",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the status machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    AttachBegan,
    StreamReady,
    DeviceWaiting,
    DevicePlaying,
    /// The device paused; `play_intent` is the user's intent at that moment.
    ///
    /// A pause while the user still wants playback is read as a stall. This
    /// is an approximation: a pause caused by something other than buffering
    /// is reported as `loading` as well.
    DevicePaused { play_intent: bool },
    FatalFault,
    PlayAccepted,
    PauseRequested,
    SessionReleased,
}

/// A status change produced by [`StatusMachine::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: PlaybackStatus,
    pub to: PlaybackStatus,
}

/// Holds the current status and applies the transition table.
#[derive(Debug, Default)]
pub struct StatusMachine {
    state: PlaybackStatus,
}

impl StatusMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> PlaybackStatus {
        self.state
    }

    /// Returns the state `event` leads to from `state`, or `None` when the
    /// event does not apply.
    pub fn next_state(state: PlaybackStatus, event: StatusEvent) -> Option<PlaybackStatus> {
        use PlaybackStatus::*;

        match event {
            StatusEvent::AttachBegan | StatusEvent::SessionReleased => Some(Offline),
            StatusEvent::FatalFault => Some(Error),
            StatusEvent::StreamReady if state != Error => Some(Ready),
            StatusEvent::DeviceWaiting if matches!(state, Ready | Live) => Some(Loading),
            StatusEvent::DevicePlaying if matches!(state, Ready | Loading) => Some(Live),
            StatusEvent::DevicePaused { play_intent: true } if state == Live => Some(Loading),
            StatusEvent::PlayAccepted if state != Error => Some(Live),
            StatusEvent::PauseRequested if matches!(state, Live | Loading) => Some(Ready),
            _ => None,
        }
    }

    /// Applies `event`. Returns the transition when the status actually changed.
    pub fn apply(&mut self, event: StatusEvent) -> Option<Transition> {
        let from = self.state;
        let to = Self::next_state(from, event)?;
        if to == from {
            return None;
        }
        self.state = to;
        Some(Transition { from, to })
    }
}
