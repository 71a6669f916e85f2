//! General utilities shared across the library.

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Normalizes a station code for comparison and storage.
///
/// Codes are matched case-insensitively by the backend; we store them upper-cased.
#[must_use]
pub fn normalize_station_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
