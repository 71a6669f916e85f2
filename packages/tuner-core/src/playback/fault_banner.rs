//! Transient fault record with timed auto-clear.
//!
//! Raising a fault replaces whatever record is visible and restarts the
//! display interval. Each record is cleared by its own timer only; a timer
//! that fires after a newer record was raised does nothing.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use crate::error::{ErrorCode, PlaybackFault};
use crate::events::{EventEmitter, PlayerEvent};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::utils::now_millis;

/// A fault as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultRecord {
    pub fault: PlaybackFault,
    /// Machine-readable code of `fault`.
    pub code: &'static str,
    /// Text for the banner.
    pub message: String,
    /// Unix timestamp in milliseconds.
    pub raised_at: u64,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    record: Option<FaultRecord>,
}

/// Holds the visible fault record and schedules its removal.
#[derive(Clone)]
pub struct FaultBanner {
    slot: Arc<Mutex<Slot>>,
    display_for: Duration,
    emitter: Arc<dyn EventEmitter>,
    spawner: TokioSpawner,
}

impl FaultBanner {
    pub fn new(
        display_for: Duration,
        emitter: Arc<dyn EventEmitter>,
        spawner: TokioSpawner,
    ) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            display_for,
            emitter,
            spawner,
        }
    }

    /// Shows `fault` with `message`, replacing any visible record.
    pub fn raise(&self, fault: PlaybackFault, message: impl Into<String>) -> FaultRecord {
        let record = FaultRecord {
            code: fault.code(),
            fault,
            message: message.into(),
            raised_at: now_millis(),
        };

        let generation = {
            let mut slot = self.slot.lock();
            slot.generation += 1;
            slot.record = Some(record.clone());
            slot.generation
        };
        self.emitter.emit_player(PlayerEvent::FaultRaised {
            record: record.clone(),
        });

        let deadline = Instant::now() + self.display_for;
        let slot = Arc::clone(&self.slot);
        let emitter = Arc::clone(&self.emitter);
        self.spawner.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let expired = {
                let mut slot = slot.lock();
                slot.generation == generation && slot.record.take().is_some()
            };
            if expired {
                emitter.emit_player(PlayerEvent::FaultCleared {
                    timestamp: now_millis(),
                });
            }
        });

        record
    }

    /// Returns the visible record, if any.
    pub fn current(&self) -> Option<FaultRecord> {
        self.slot.lock().record.clone()
    }

    /// Clears the visible record immediately.
    pub fn dismiss(&self) {
        let cleared = {
            let mut slot = self.slot.lock();
            slot.generation += 1;
            slot.record.take().is_some()
        };
        if cleared {
            self.emitter.emit_player(PlayerEvent::FaultCleared {
                timestamp: now_millis(),
            });
        }
    }
}
