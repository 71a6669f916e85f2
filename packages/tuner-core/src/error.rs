//! Centralized error types for the tuner core library.
//!
//! This module provides a unified error handling system that:
//! - Defines the playback fault taxonomy surfaced to listeners ([`PlaybackFault`])
//! - Defines the crate-wide error returned by fallible operations ([`TunerError`])
//! - Maps every error to a stable machine-readable code via [`ErrorCode`]

use serde::Serialize;
use thiserror::Error;

use crate::playback::DeviceError;
use crate::station::CatalogError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and front-ends.
    fn code(&self) -> &'static str;
}

impl ErrorCode for DeviceError {
    fn code(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "playback_rejected",
            Self::Unavailable(_) => "device_unavailable",
        }
    }
}

impl ErrorCode for CatalogError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_, _) => "http_error_status",
            Self::NotFound(_) => "station_not_found",
        }
    }
}

/// Faults raised while attaching or playing a stream.
///
/// Every variant carries a human-readable detail string. The fault never
/// escapes the controller as an error; it is recorded and shown to the user
/// for a bounded interval instead.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "camelCase")]
pub enum PlaybackFault {
    /// Neither an adaptive engine nor native device support is available.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Network-level loading failure; recovered by restarting the load.
    #[error("Network fault: {0}")]
    TransientNetwork(String),

    /// Decode or buffer failure; recovered by the engine's media recovery.
    #[error("Media fault: {0}")]
    TransientMedia(String),

    /// Unrecoverable engine failure; the session is abandoned.
    #[error("Fatal engine fault: {0}")]
    FatalEngine(String),

    /// The device refused to start playback (e.g. an autoplay policy).
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),
}

impl PlaybackFault {
    /// Returns true when the fault moves the player into the error state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnsupportedFormat(_) | Self::FatalEngine(_))
    }

    /// Returns the detail string reported by the failing component.
    pub fn detail(&self) -> &str {
        match self {
            Self::UnsupportedFormat(d)
            | Self::TransientNetwork(d)
            | Self::TransientMedia(d)
            | Self::FatalEngine(d)
            | Self::PlaybackRejected(d) => d,
        }
    }
}

impl ErrorCode for PlaybackFault {
    fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::TransientNetwork(_) => "transient_network",
            Self::TransientMedia(_) => "transient_media",
            Self::FatalEngine(_) => "fatal_engine",
            Self::PlaybackRejected(_) => "playback_rejected",
        }
    }
}

/// Application-wide error type for the tuner.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum TunerError {
    /// A playback command arrived while no stream session is attached.
    #[error("No stream session is attached")]
    NoSession,

    /// The station catalog could not be read.
    #[error("Station catalog error: {0}")]
    Catalog(String),

    /// Requested station code does not exist.
    #[error("Station not found: {0}")]
    StationNotFound(String),

    /// Persisted state could not be written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration failed validation.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TunerError {
    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::Catalog(_) => "catalog_error",
            Self::StationNotFound(_) => "station_not_found",
            Self::Storage(_) => "storage_error",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<CatalogError> for TunerError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(code) => Self::StationNotFound(code),
            other => Self::Catalog(other.to_string()),
        }
    }
}

impl From<std::io::Error> for TunerError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type alias using [`TunerError`].
pub type TunerResult<T> = Result<T, TunerError>;
