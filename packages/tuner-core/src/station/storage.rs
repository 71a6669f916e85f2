//! Persistence of the last-selected station code.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::protocol_constants::LAST_STATION_FILE;
use crate::utils::normalize_station_code;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastStationFile {
    station_code: String,
}

/// Stores the last-selected station code as JSON in a data directory.
#[derive(Debug, Clone)]
pub struct LastStationStore {
    dir: PathBuf,
    default_code: String,
}

impl LastStationStore {
    pub fn new(dir: impl Into<PathBuf>, default_code: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            default_code: default_code.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(LAST_STATION_FILE)
    }

    /// Returns the saved code, or the default if the file is missing or invalid.
    pub fn load(&self) -> String {
        std::fs::read_to_string(self.path())
            .ok()
            .and_then(|contents| serde_json::from_str::<LastStationFile>(&contents).ok())
            .map(|file| file.station_code)
            .filter(|code| !code.trim().is_empty())
            .unwrap_or_else(|| self.default_code.clone())
    }

    /// Saves `code`.
    ///
    /// Uses atomic write (temp file + rename) to prevent corruption on crash.
    /// Creates the directory if it doesn't exist.
    pub fn save(&self, code: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let temp_path = self.dir.join(format!("{}.tmp", LAST_STATION_FILE));
        let contents = serde_json::to_string_pretty(&LastStationFile {
            station_code: normalize_station_code(code),
        })?;

        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, self.path())
    }

    /// Forgets the saved code. Missing files are not an error.
    pub fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(self.path()) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LastStationStore::new(dir.path(), "ENGLISH");
        assert_eq!(store.load(), "ENGLISH");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LastStationStore::new(dir.path().join("nested"), "ENGLISH");

        store.save("hindi").expect("save");

        assert_eq!(store.load(), "HINDI");
        assert!(!store.dir().join("last_station.json.tmp").exists());
    }

    #[test]
    fn corrupt_file_yields_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LastStationStore::new(dir.path(), "ENGLISH");
        std::fs::write(store.path(), "{not json").expect("write");

        assert_eq!(store.load(), "ENGLISH");
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LastStationStore::new(dir.path(), "ENGLISH");
        store.save("TAMIL").expect("save");

        store.clear().expect("clear");
        store.clear().expect("clear again");

        assert_eq!(store.load(), "ENGLISH");
    }
}
