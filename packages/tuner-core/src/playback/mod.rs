//! Live stream playback: device adapter, session lifecycle, failure
//! recovery and the playback status machine, tied together by
//! [`PlayerController`].

mod controller;
mod device;
mod dispatch;
mod fault_banner;
pub mod recovery;
mod session;
mod status;
mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{PlayerController, PlayerSnapshot};
pub use device::{DeviceAdapter, Volume};
pub use dispatch::{DeviceEventSink, EngineEventSink, SessionId, SessionInbox, SessionMessage};
pub use fault_banner::{FaultBanner, FaultRecord};
pub use recovery::{classify, RecoveryAction, RecoveryDecision};
pub use session::{
    AttachOutcome, AttachReport, Session, SessionManager, SessionMode, StreamDescriptor,
};
pub use status::{PlaybackStatus, StatusEvent, StatusMachine, Transition};
pub use traits::{
    DeviceError, DeviceEvent, EngineEvent, EngineFactory, EngineFault, EngineOptions, FaultKind,
    NoEngineFactory, PlaybackDevice, StreamingEngine,
};
