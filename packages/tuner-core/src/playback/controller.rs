//! The player controller: command surface and session event loop.
//!
//! All engine and device callbacks arrive as [`SessionMessage`]s on one
//! channel and are applied in arrival order by [`PlayerController::dispatch`].
//! Commands and messages mutate the same state behind one lock, which is
//! never held across an await point. Events and fault records produced while
//! the lock is held are delivered after it is released.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::device::{DeviceAdapter, Volume};
use super::dispatch::{DeviceEventSink, SessionId, SessionInbox, SessionMessage};
use super::fault_banner::{FaultBanner, FaultRecord};
use super::recovery::{self, RecoveryAction, PLAY_REJECTED_MESSAGE, UNSUPPORTED_MESSAGE};
use super::session::{AttachOutcome, Session, SessionManager, SessionMode, StreamDescriptor};
use super::status::{PlaybackStatus, StatusEvent, StatusMachine};
use super::traits::{DeviceEvent, EngineEvent, EngineFactory, EngineFault, PlaybackDevice};
use crate::error::{PlaybackFault, TunerError, TunerResult};
use crate::events::{EventEmitter, PlayerEvent};
use crate::runtime::TokioSpawner;
use crate::state::PlayerConfig;
use crate::utils::now_millis;

/// Serializable view of the player for front-ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub status: PlaybackStatus,
    pub status_label: &'static str,
    pub volume: u8,
    pub play_intent: bool,
    pub fault: Option<FaultRecord>,
    pub stream_url: Option<String>,
    pub session_id: Option<u64>,
    pub session_mode: Option<SessionMode>,
}

struct ControllerState {
    sessions: SessionManager,
    status: StatusMachine,
    volume: Volume,
    play_intent: bool,
    /// Last non-empty descriptor requested, kept even when attach failed.
    descriptor: Option<StreamDescriptor>,
}

/// Work collected under the state lock and performed after releasing it.
///
/// Device commands go through here too, so a device that reports back
/// synchronously never finds the state locked.
#[derive(Default)]
struct Outbox {
    pause: bool,
    volume: Option<Volume>,
    events: Vec<PlayerEvent>,
    fault: Option<(PlaybackFault, &'static str)>,
}

impl ControllerState {
    fn transition(&mut self, event: StatusEvent, outbox: &mut Outbox) {
        if let Some(t) = self.status.apply(event) {
            log::info!("[Player] Status {} -> {} ({:?})", t.from, t.to, event);
            outbox.events.push(PlayerEvent::StatusChanged {
                from: t.from,
                to: t.to,
                label: t.to.label(),
                timestamp: now_millis(),
            });
        }
    }

    fn release(&mut self, outbox: &mut Outbox) {
        if let Some(id) = self.sessions.teardown() {
            outbox.events.push(released_event(id));
        }
    }
}

fn released_event(id: SessionId) -> PlayerEvent {
    PlayerEvent::SessionReleased {
        session_id: id.as_u64(),
        timestamp: now_millis(),
    }
}

/// Owns the current session, the status machine, volume and play intent.
pub struct PlayerController {
    state: Mutex<ControllerState>,
    device: DeviceAdapter,
    banner: FaultBanner,
    emitter: Arc<dyn EventEmitter>,
}

impl PlayerController {
    /// Creates a controller with no session, subscribed to `device`.
    ///
    /// Returns the inbox that must be fed to [`run`](Self::run) (or drained
    /// with [`drain`](Self::drain)) for engine and device events to take effect.
    pub fn new(
        device: Arc<dyn PlaybackDevice>,
        engines: Arc<dyn EngineFactory>,
        config: &PlayerConfig,
        emitter: Arc<dyn EventEmitter>,
        spawner: TokioSpawner,
    ) -> (Self, SessionInbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        let active = Arc::new(AtomicU64::new(0));

        let device = DeviceAdapter::new(device);
        device.subscribe(DeviceEventSink::new(Arc::clone(&active), tx.clone()));

        let volume = Volume::clamped(i64::from(config.default_volume));
        device.apply_volume(volume);

        let sessions = SessionManager::new(
            device.clone(),
            engines,
            config.engine.clone(),
            tx,
            active,
        );
        let banner = FaultBanner::new(
            Duration::from_secs(config.fault_display_secs),
            Arc::clone(&emitter),
            spawner,
        );

        let controller = Self {
            state: Mutex::new(ControllerState {
                sessions,
                status: StatusMachine::new(),
                volume,
                play_intent: false,
                descriptor: None,
            }),
            device,
            banner,
            emitter,
        };
        (controller, rx)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn status(&self) -> PlaybackStatus {
        self.state.lock().status.current()
    }

    pub fn volume(&self) -> Volume {
        self.state.lock().volume
    }

    pub fn play_intent(&self) -> bool {
        self.state.lock().play_intent
    }

    /// Returns the visible fault record, if any.
    pub fn fault(&self) -> Option<FaultRecord> {
        self.banner.current()
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.state.lock().sessions.current().map(Session::id)
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let state = self.state.lock();
        let session = state.sessions.current();
        let status = state.status.current();
        PlayerSnapshot {
            status,
            status_label: status.label(),
            volume: state.volume.percent(),
            play_intent: state.play_intent,
            fault: self.banner.current(),
            stream_url: state.descriptor.as_ref().map(|d| d.url.clone()),
            session_id: session.map(|s| s.id().as_u64()),
            session_mode: session.map(Session::mode),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Reacts to a change of the current stream descriptor.
    ///
    /// A new descriptor replaces the session; `None` or an empty URL tears it
    /// down. Repeating the current descriptor does nothing. Play intent is left
    /// as it was, but the new session never starts playing by itself.
    pub fn set_stream(&self, descriptor: Option<StreamDescriptor>) {
        let descriptor = descriptor.filter(|d| !d.is_empty());
        let mut outbox = Outbox::default();
        {
            let mut state = self.state.lock();
            if state.descriptor == descriptor {
                log::debug!("[Player] Stream unchanged, ignoring");
                return;
            }
            match descriptor {
                Some(descriptor) => self.attach_locked(&mut state, descriptor, &mut outbox),
                None => {
                    log::info!("[Player] Stream cleared");
                    state.descriptor = None;
                    state.release(&mut outbox);
                    state.transition(StatusEvent::SessionReleased, &mut outbox);
                }
            }
        }
        self.flush(outbox);
    }

    /// Re-attaches the last requested stream, leaving `error` if it was set.
    pub fn reload(&self) -> TunerResult<()> {
        let mut outbox = Outbox::default();
        {
            let mut state = self.state.lock();
            let descriptor = state.descriptor.clone().ok_or(TunerError::NoSession)?;
            log::info!("[Player] Reloading {}", descriptor);
            self.attach_locked(&mut state, descriptor, &mut outbox);
        }
        self.flush(outbox);
        Ok(())
    }

    /// Starts playback when not playing, pauses otherwise.
    ///
    /// Returns the status after the command. A device rejection is reported as
    /// a fault record rather than an error.
    pub async fn toggle_play(&self) -> TunerResult<PlaybackStatus> {
        let mut outbox = Outbox::default();
        let session = {
            let mut state = self.state.lock();
            let session = state
                .sessions
                .current()
                .map(Session::id)
                .ok_or(TunerError::NoSession)?;

            if state.play_intent {
                state.play_intent = false;
                outbox.pause = true;
                state.transition(StatusEvent::PauseRequested, &mut outbox);
                let status = state.status.current();
                drop(state);
                self.flush(outbox);
                return Ok(status);
            }

            state.play_intent = true;
            session
        };

        let result = self.device.play().await;

        let status = {
            let mut state = self.state.lock();
            match result {
                Ok(()) if state.play_intent && state.sessions.is_current(session) => {
                    state.transition(StatusEvent::PlayAccepted, &mut outbox);
                }
                Ok(()) => {
                    log::debug!(
                        "[Player] Play for session {} resolved after it was replaced or paused",
                        session
                    );
                }
                Err(e) => {
                    log::warn!("[Player] Device rejected play: {}", e);
                    state.play_intent = false;
                    outbox.fault = Some((
                        PlaybackFault::PlaybackRejected(e.to_string()),
                        PLAY_REJECTED_MESSAGE,
                    ));
                }
            }
            state.status.current()
        };
        self.flush(outbox);
        Ok(status)
    }

    /// Sets the volume, clamped to 0..=100, and mirrors it onto the device.
    pub fn set_volume(&self, percent: i64) -> Volume {
        let volume = Volume::clamped(percent);
        let changed = {
            let mut state = self.state.lock();
            std::mem::replace(&mut state.volume, volume) != volume
        };
        self.device.apply_volume(volume);
        if changed {
            self.emitter.emit_player(PlayerEvent::VolumeChanged {
                volume: volume.percent(),
                timestamp: now_millis(),
            });
        }
        volume
    }

    /// Hides the visible fault record.
    pub fn dismiss_fault(&self) {
        self.banner.dismiss();
    }

    /// Tears down the session and forgets the stream.
    pub fn shutdown(&self) {
        self.set_stream(None);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event loop
    // ─────────────────────────────────────────────────────────────────────────

    /// Applies one engine or device message.
    ///
    /// Messages tagged with a session other than the current one are dropped.
    pub fn dispatch(&self, message: SessionMessage) {
        let mut outbox = Outbox::default();
        {
            let mut state = self.state.lock();
            let session = message.session();
            if !state.sessions.is_current(session) {
                log::debug!(
                    "[Player] Dropping stale message for session {}: {:?}",
                    session,
                    message
                );
                return;
            }

            match message {
                SessionMessage::Engine {
                    event: EngineEvent::ManifestParsed,
                    ..
                } => {
                    let first = state
                        .sessions
                        .current_mut()
                        .is_some_and(Session::mark_ready);
                    if first {
                        state.transition(StatusEvent::StreamReady, &mut outbox);
                    }
                }
                SessionMessage::Engine {
                    event: EngineEvent::Fault(fault),
                    ..
                } => Self::handle_fault(&mut state, &fault, &mut outbox),
                SessionMessage::Device { event, .. } => {
                    let event = match event {
                        DeviceEvent::Waiting => StatusEvent::DeviceWaiting,
                        DeviceEvent::Playing => StatusEvent::DevicePlaying,
                        DeviceEvent::Pause => StatusEvent::DevicePaused {
                            play_intent: state.play_intent,
                        },
                    };
                    state.transition(event, &mut outbox);
                }
            }
        }
        self.flush(outbox);
    }

    /// Dispatches every message already queued. Returns how many were applied.
    pub fn drain(&self, inbox: &mut SessionInbox) -> usize {
        let mut count = 0;
        while let Ok(message) = inbox.try_recv() {
            self.dispatch(message);
            count += 1;
        }
        count
    }

    /// Consumes the inbox until `cancel` fires.
    pub async fn run(self: Arc<Self>, mut inbox: SessionInbox, cancel: CancellationToken) {
        log::debug!("[Player] Event loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                message = inbox.recv() => match message {
                    Some(message) => self.dispatch(message),
                    None => break,
                },
            }
        }
        log::debug!("[Player] Event loop stopped");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn attach_locked(
        &self,
        state: &mut ControllerState,
        descriptor: StreamDescriptor,
        outbox: &mut Outbox,
    ) {
        state.descriptor = Some(descriptor.clone());
        let report = state.sessions.attach(descriptor.clone());
        if let Some(id) = report.released {
            outbox.events.push(released_event(id));
        }
        state.transition(StatusEvent::AttachBegan, outbox);

        let (id, mode) = match report.outcome {
            AttachOutcome::Engine(id) => (id, SessionMode::Engine),
            AttachOutcome::Native(id) => (id, SessionMode::Native),
            AttachOutcome::Unsupported => {
                state.transition(StatusEvent::FatalFault, outbox);
                outbox.fault = Some((
                    PlaybackFault::UnsupportedFormat(descriptor.url),
                    UNSUPPORTED_MESSAGE,
                ));
                return;
            }
        };

        outbox.volume = Some(state.volume);
        outbox.events.push(PlayerEvent::SessionAttached {
            session_id: id.as_u64(),
            stream_url: descriptor.url,
            mode,
            timestamp: now_millis(),
        });

        if mode == SessionMode::Native {
            if let Some(session) = state.sessions.current_mut() {
                session.mark_ready();
            }
            state.transition(StatusEvent::StreamReady, outbox);
        }
    }

    fn handle_fault(state: &mut ControllerState, fault: &EngineFault, outbox: &mut Outbox) {
        let decision = recovery::classify(fault);
        log::warn!(
            "[Recovery] {:?} fault (fatal={}): {} -> {:?}",
            fault.kind,
            fault.fatal,
            fault.detail,
            decision.action
        );

        match decision.action {
            RecoveryAction::ReportOnly => {}
            RecoveryAction::RetryLoad => {
                if let Some(session) = state.sessions.current_mut() {
                    session.retry_load();
                }
            }
            RecoveryAction::RecoverMedia => {
                if let Some(session) = state.sessions.current_mut() {
                    session.recover_media();
                }
            }
            RecoveryAction::AbortFatal => state.transition(StatusEvent::FatalFault, outbox),
        }
        outbox.fault = Some((decision.fault, decision.message));
    }

    fn flush(&self, outbox: Outbox) {
        if outbox.pause {
            self.device.pause();
        }
        if let Some(volume) = outbox.volume {
            self.device.apply_volume(volume);
        }
        for event in outbox.events {
            self.emitter.emit_player(event);
        }
        if let Some((fault, message)) = outbox.fault {
            self.banner.raise(fault, message);
        }
    }
}
