//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by external specifications (HLS, MIME registry)
//! or by the station backend, and changing them would break interoperability.

// ─────────────────────────────────────────────────────────────────────────────
// HLS (HTTP Live Streaming, RFC 8216)
// ─────────────────────────────────────────────────────────────────────────────

/// MIME type a device must accept to play HLS playlists natively.
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

/// Tag every HLS playlist must start with.
pub const EXTM3U_TAG: &str = "#EXTM3U";

/// Tag carrying the maximum segment duration (seconds) of a media playlist.
pub const TARGET_DURATION_TAG: &str = "#EXT-X-TARGETDURATION:";

/// Tag marking a multivariant playlist entry.
pub const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF:";

/// Tag marking the end of a finite playlist.
pub const ENDLIST_TAG: &str = "#EXT-X-ENDLIST";

// ─────────────────────────────────────────────────────────────────────────────
// Station Backend
// ─────────────────────────────────────────────────────────────────────────────

/// Timeout for station catalog HTTP requests (seconds).
pub const CATALOG_TIMEOUT_SECS: u64 = 10;

/// Station code used when nothing has been persisted yet.
pub const DEFAULT_STATION_CODE: &str = "ENGLISH";

/// File name of the persisted last-selected station.
pub const LAST_STATION_FILE: &str = "last_station.json";

/// Stream served by the fallback station when the catalog is unreachable.
pub const FALLBACK_STREAM_URL: &str = "https://d3d4yli4hf5bmh.cloudfront.net/hls/live.m3u8";

/// Metadata endpoint of the fallback station.
pub const FALLBACK_METADATA_URL: &str = "/api/metadata/english";

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used in the HTTP user agent.
pub const APP_NAME: &str = "Radio Tuner";
