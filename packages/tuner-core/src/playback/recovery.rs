//! Failure classification and recovery policy.
//!
//! Maps an [`EngineFault`] to exactly one [`RecoveryAction`] plus the fault
//! record shown to the user. The policy is stateless: there is no retry
//! budget or backoff, and recovery runs once per fatal fault as reported.

use serde::Serialize;

use super::traits::{EngineFault, FaultKind};
use crate::error::PlaybackFault;

// ─────────────────────────────────────────────────────────────────────────────
// User-facing messages
// ─────────────────────────────────────────────────────────────────────────────

pub const NETWORK_RETRY_MESSAGE: &str =
    "Network error. Please check your connection and try again.";
pub const MEDIA_RECOVERY_MESSAGE: &str = "Media error. Attempting to recover...";
pub const FATAL_MESSAGE: &str = "Fatal error occurred. Please reload the station.";
pub const UNSUPPORTED_MESSAGE: &str = "HLS streaming is not supported on this device.";
pub const PLAY_REJECTED_MESSAGE: &str = "Failed to start playback. Please try again.";
pub const TRANSIENT_NETWORK_MESSAGE: &str = "Connection unstable. Buffering...";
pub const TRANSIENT_MEDIA_MESSAGE: &str = "Playback hiccup detected.";

/// What the controller does in response to a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecoveryAction {
    /// Record the fault; the engine is left alone.
    ReportOnly,
    /// Restart loading on the same engine.
    RetryLoad,
    /// Rebuild the media pipeline on the same engine.
    RecoverMedia,
    /// Give up on the session; the player moves to `error`.
    AbortFatal,
}

/// Classifier output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryDecision {
    pub action: RecoveryAction,
    pub fault: PlaybackFault,
    pub message: &'static str,
}

/// Classifies an engine fault.
///
/// | fatal | kind    | action       |
/// |-------|---------|--------------|
/// | no    | any     | ReportOnly   |
/// | yes   | Network | RetryLoad    |
/// | yes   | Media   | RecoverMedia |
/// | yes   | other   | AbortFatal   |
pub fn classify(fault: &EngineFault) -> RecoveryDecision {
    let detail = fault.detail.clone();
    match (fault.fatal, fault.kind) {
        (false, FaultKind::Network) => RecoveryDecision {
            action: RecoveryAction::ReportOnly,
            fault: PlaybackFault::TransientNetwork(detail),
            message: TRANSIENT_NETWORK_MESSAGE,
        },
        (false, _) => RecoveryDecision {
            action: RecoveryAction::ReportOnly,
            fault: PlaybackFault::TransientMedia(detail),
            message: TRANSIENT_MEDIA_MESSAGE,
        },
        (true, FaultKind::Network) => RecoveryDecision {
            action: RecoveryAction::RetryLoad,
            fault: PlaybackFault::TransientNetwork(detail),
            message: NETWORK_RETRY_MESSAGE,
        },
        (true, FaultKind::Media) => RecoveryDecision {
            action: RecoveryAction::RecoverMedia,
            fault: PlaybackFault::TransientMedia(detail),
            message: MEDIA_RECOVERY_MESSAGE,
        },
        (true, _) => RecoveryDecision {
            action: RecoveryAction::AbortFatal,
            fault: PlaybackFault::FatalEngine(detail),
            message: FATAL_MESSAGE,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_fatal_faults_only_report() {
        for kind in [
            FaultKind::Network,
            FaultKind::Media,
            FaultKind::Mux,
            FaultKind::KeySystem,
            FaultKind::Other,
        ] {
            let decision = classify(&EngineFault::transient(kind, "glitch"));
            assert_eq!(decision.action, RecoveryAction::ReportOnly, "{kind:?}");
            assert!(!decision.fault.is_fatal());
        }
    }

    #[test]
    fn fatal_network_retries_load() {
        let decision = classify(&EngineFault::fatal(FaultKind::Network, "manifestLoadError"));
        assert_eq!(decision.action, RecoveryAction::RetryLoad);
        assert_eq!(
            decision.fault,
            PlaybackFault::TransientNetwork("manifestLoadError".into())
        );
        assert_eq!(decision.message, NETWORK_RETRY_MESSAGE);
    }

    #[test]
    fn fatal_media_recovers() {
        let decision = classify(&EngineFault::fatal(FaultKind::Media, "bufferStalledError"));
        assert_eq!(decision.action, RecoveryAction::RecoverMedia);
        assert_eq!(decision.message, MEDIA_RECOVERY_MESSAGE);
    }

    #[test]
    fn other_fatal_kinds_abort() {
        for kind in [FaultKind::Mux, FaultKind::KeySystem, FaultKind::Other] {
            let decision = classify(&EngineFault::fatal(kind, "boom"));
            assert_eq!(decision.action, RecoveryAction::AbortFatal, "{kind:?}");
            assert!(decision.fault.is_fatal());
            assert_eq!(decision.message, FATAL_MESSAGE);
        }
    }
}
