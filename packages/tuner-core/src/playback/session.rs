//! Stream session lifecycle.
//!
//! A [`Session`] binds one stream descriptor to the playback device, either
//! through a dedicated streaming engine instance or through the device's
//! native HLS support. [`SessionManager`] guarantees at most one live
//! session: attaching always tears the previous one down first, and dropping
//! a session destroys its engine and unloads the device.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::device::DeviceAdapter;
use super::dispatch::{EngineEventSink, SessionId, SessionMessage};
use super::traits::{EngineFactory, EngineOptions, StreamingEngine};

/// What to play.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    /// HLS playlist URL.
    pub url: String,
    /// Codec hint from the station catalog, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec_hint: Option<String>,
}

impl StreamDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            codec_hint: None,
        }
    }

    pub fn with_codec_hint(mut self, hint: impl Into<String>) -> Self {
        self.codec_hint = Some(hint.into());
        self
    }

    /// Returns true when there is no URL to play.
    pub fn is_empty(&self) -> bool {
        self.url.trim().is_empty()
    }
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// How a session drives the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionMode {
    /// Through an adaptive-streaming engine instance.
    Engine,
    /// The device plays the playlist itself.
    Native,
}

enum Backend {
    Engine(Box<dyn StreamingEngine>),
    Native,
}

/// One attachment of a stream to the device.
pub struct Session {
    id: SessionId,
    descriptor: StreamDescriptor,
    backend: Backend,
    device: DeviceAdapter,
    ready_reported: bool,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    pub fn mode(&self) -> SessionMode {
        match self.backend {
            Backend::Engine(_) => SessionMode::Engine,
            Backend::Native => SessionMode::Native,
        }
    }

    /// Records the first readiness report. Returns false on repeats.
    pub(crate) fn mark_ready(&mut self) -> bool {
        !std::mem::replace(&mut self.ready_reported, true)
    }

    /// Asks the engine to restart loading. Returns false for native sessions.
    pub(crate) fn retry_load(&mut self) -> bool {
        match &mut self.backend {
            Backend::Engine(engine) => {
                engine.retry_load();
                true
            }
            Backend::Native => false,
        }
    }

    /// Asks the engine to rebuild its media pipeline. Returns false for native sessions.
    pub(crate) fn recover_media(&mut self) -> bool {
        match &mut self.backend {
            Backend::Engine(engine) => {
                engine.recover_media_error();
                true
            }
            Backend::Native => false,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Backend::Engine(engine) = &mut self.backend {
            engine.destroy();
        }
        self.device.unload();
        log::info!(
            "[Session] Released session {} ({})",
            self.id,
            self.descriptor
        );
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .field("mode", &self.mode())
            .field("ready_reported", &self.ready_reported)
            .finish()
    }
}

/// Result of an attach request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// An engine instance was created; readiness arrives as `ManifestParsed`.
    Engine(SessionId),
    /// The device plays the stream natively and is ready immediately.
    Native(SessionId),
    /// Neither path is available. No session was kept.
    Unsupported,
}

/// Outcome of [`SessionManager::attach`], including the session it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachReport {
    pub released: Option<SessionId>,
    pub outcome: AttachOutcome,
}

/// Owns the current session, if any.
pub struct SessionManager {
    device: DeviceAdapter,
    engines: Arc<dyn EngineFactory>,
    options: EngineOptions,
    messages: mpsc::UnboundedSender<SessionMessage>,
    active: Arc<AtomicU64>,
    next_id: u64,
    current: Option<Session>,
}

impl SessionManager {
    /// Creates a manager with no session.
    ///
    /// `active` is the cell the device event sink reads; the manager keeps it
    /// equal to the current session id (0 when detached).
    pub fn new(
        device: DeviceAdapter,
        engines: Arc<dyn EngineFactory>,
        options: EngineOptions,
        messages: mpsc::UnboundedSender<SessionMessage>,
        active: Arc<AtomicU64>,
    ) -> Self {
        active.store(SessionId::NONE.as_u64(), Ordering::SeqCst);
        Self {
            device,
            engines,
            options,
            messages,
            active,
            next_id: 1,
            current: None,
        }
    }

    /// Tears down any current session, then binds `descriptor` to the device.
    ///
    /// The engine path is preferred; native device support is the fallback.
    pub fn attach(&mut self, descriptor: StreamDescriptor) -> AttachReport {
        let released = self.teardown();

        let id = SessionId::from_raw(self.next_id);
        self.next_id += 1;

        let backend = if self.engines.is_supported() {
            let sink = EngineEventSink::new(id, self.messages.clone());
            let mut engine = self.engines.create(&self.options, sink);
            engine.load_source(&descriptor.url);
            engine.attach_device(self.device.handle());
            Backend::Engine(engine)
        } else if self.device.supports_native_streaming() {
            self.device.load_source(&descriptor.url);
            Backend::Native
        } else {
            log::warn!(
                "[Session] No streaming engine or native support for {}",
                descriptor
            );
            return AttachReport {
                released,
                outcome: AttachOutcome::Unsupported,
            };
        };

        let session = Session {
            id,
            descriptor,
            backend,
            device: self.device.clone(),
            ready_reported: false,
        };
        let outcome = match session.mode() {
            SessionMode::Engine => AttachOutcome::Engine(id),
            SessionMode::Native => AttachOutcome::Native(id),
        };
        log::info!(
            "[Session] Attached session {} ({:?}) to {}",
            id,
            session.mode(),
            session.descriptor
        );

        self.active.store(id.as_u64(), Ordering::SeqCst);
        self.current = Some(session);
        AttachReport { released, outcome }
    }

    /// Releases the current session. Idempotent.
    ///
    /// Returns the id of the released session, if there was one.
    pub fn teardown(&mut self) -> Option<SessionId> {
        let session = self.current.take()?;
        self.active
            .store(SessionId::NONE.as_u64(), Ordering::SeqCst);
        let id = session.id;
        drop(session);
        Some(id)
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut Session> {
        self.current.as_mut()
    }

    /// Returns true when `id` names the live session.
    pub fn is_current(&self, id: SessionId) -> bool {
        self.current.as_ref().is_some_and(|s| s.id == id)
    }
}
