//! Session-tagged message plumbing between backends and the controller.
//!
//! Engines and the device never call into the controller directly. They push
//! [`SessionMessage`]s onto an unbounded channel, each stamped with the
//! [`SessionId`] that was current when the event was raised. The controller
//! drops messages whose session is no longer the current one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use super::traits::{DeviceEvent, EngineEvent};

/// Identity of one stream session.
///
/// Ids are never reused within a controller. `SessionId::NONE` marks events
/// raised while no session was attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Placeholder id for events raised with no session attached.
    pub const NONE: SessionId = SessionId(0);

    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the numeric id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A backend event tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMessage {
    /// Raised by the session's streaming engine.
    Engine {
        session: SessionId,
        event: EngineEvent,
    },
    /// Raised by the playback device.
    Device {
        session: SessionId,
        event: DeviceEvent,
    },
}

impl SessionMessage {
    /// Returns the session the message was raised for.
    pub fn session(&self) -> SessionId {
        match self {
            Self::Engine { session, .. } | Self::Device { session, .. } => *session,
        }
    }
}

/// Receiving half of the session message channel.
pub type SessionInbox = mpsc::UnboundedReceiver<SessionMessage>;

/// Sink handed to one engine instance. Every event is tagged with that
/// instance's session.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl EngineEventSink {
    pub(crate) fn new(session: SessionId, tx: mpsc::UnboundedSender<SessionMessage>) -> Self {
        Self { session, tx }
    }

    /// Returns the session this sink reports for.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Reports an engine event. Events sent after the controller is gone are dropped.
    pub fn send(&self, event: EngineEvent) {
        let message = SessionMessage::Engine {
            session: self.session,
            event,
        };
        if self.tx.send(message).is_err() {
            log::trace!("[Session] Controller gone, dropping engine event");
        }
    }

    /// Returns true once the controller has stopped listening.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Sink handed to the playback device.
///
/// The device outlives sessions, so the tag is read from the controller's
/// active-session cell at the moment the event is raised.
#[derive(Debug, Clone)]
pub struct DeviceEventSink {
    active: Arc<AtomicU64>,
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl DeviceEventSink {
    pub(crate) fn new(active: Arc<AtomicU64>, tx: mpsc::UnboundedSender<SessionMessage>) -> Self {
        Self { active, tx }
    }

    /// Reports a device event.
    pub fn send(&self, event: DeviceEvent) {
        let session = SessionId(self.active.load(Ordering::SeqCst));
        if self.tx.send(SessionMessage::Device { session, event }).is_err() {
            log::trace!("[Session] Controller gone, dropping device event");
        }
    }
}
