//! Station list and current-station selection.

use std::sync::Arc;

use parking_lot::RwLock;

use super::catalog::{fetch_or_fallback, Station, StationCatalog};
use super::storage::LastStationStore;
use crate::error::{TunerError, TunerResult};
use crate::events::{EventEmitter, StationEvent};
use crate::utils::now_millis;

#[derive(Default)]
struct DirectoryState {
    stations: Vec<Station>,
    current: Option<Station>,
    fallback: bool,
}

/// Holds the loaded catalog and the selected station.
///
/// Selection is persisted through [`LastStationStore`] when one is configured.
pub struct StationDirectory {
    catalog: Arc<dyn StationCatalog>,
    store: Option<LastStationStore>,
    default_code: String,
    emitter: Arc<dyn EventEmitter>,
    state: RwLock<DirectoryState>,
}

impl StationDirectory {
    pub fn new(
        catalog: Arc<dyn StationCatalog>,
        store: Option<LastStationStore>,
        default_code: impl Into<String>,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            catalog,
            store,
            default_code: default_code.into(),
            emitter,
            state: RwLock::new(DirectoryState::default()),
        }
    }

    /// Loads the catalog and restores the initial selection.
    ///
    /// The saved code wins, then the first active station, then the first
    /// station. Returns the selected station, if the catalog was non-empty.
    pub async fn load(&self) -> Option<Station> {
        let (stations, fallback) = fetch_or_fallback(self.catalog.as_ref()).await;
        let saved = self
            .store
            .as_ref()
            .map(LastStationStore::load)
            .unwrap_or_else(|| self.default_code.clone());
        let initial = pick_initial(&stations, &saved).cloned();

        log::info!(
            "[Stations] Loaded {} station(s){}, selected {}",
            stations.len(),
            if fallback { " (fallback)" } else { "" },
            initial.as_ref().map_or("none", |s| s.code.as_str())
        );

        let count = stations.len();
        {
            let mut state = self.state.write();
            state.stations = stations;
            state.current = initial.clone();
            state.fallback = fallback;
        }

        self.emitter.emit_station(StationEvent::CatalogLoaded {
            count,
            fallback,
            timestamp: now_millis(),
        });
        if let Some(ref station) = initial {
            self.emit_selected(station);
        }
        initial
    }

    pub fn stations(&self) -> Vec<Station> {
        self.state.read().stations.clone()
    }

    pub fn current(&self) -> Option<Station> {
        self.state.read().current.clone()
    }

    /// True when the last load used the built-in fallback list.
    pub fn is_fallback(&self) -> bool {
        self.state.read().fallback
    }

    /// Selects the loaded station with `code` and persists the choice.
    ///
    /// Unknown codes leave the selection unchanged. A failed save is logged
    /// and does not undo the selection.
    pub fn change_station(&self, code: &str) -> TunerResult<Station> {
        let station = {
            let mut state = self.state.write();
            let station = state
                .stations
                .iter()
                .find(|s| s.code.eq_ignore_ascii_case(code.trim()))
                .cloned()
                .ok_or_else(|| TunerError::StationNotFound(code.to_string()))?;
            state.current = Some(station.clone());
            station
        };

        if let Some(ref store) = self.store {
            if let Err(e) = store.save(&station.code) {
                log::warn!(
                    "[Stations] Failed to persist station {} to {}: {}",
                    station.code,
                    store.path().display(),
                    e
                );
            }
        }

        log::info!("[Stations] Selected {} ({})", station.code, station.name);
        self.emit_selected(&station);
        Ok(station)
    }

    /// Fetches a single station straight from the catalog.
    pub async fn lookup(&self, code: &str) -> TunerResult<Station> {
        Ok(self.catalog.station_by_code(code).await?)
    }

    fn emit_selected(&self, station: &Station) {
        self.emitter.emit_station(StationEvent::Selected {
            code: station.code.clone(),
            name: station.name.clone(),
            stream_url: station.stream_url.clone(),
            timestamp: now_millis(),
        });
    }
}

fn pick_initial<'a>(stations: &'a [Station], saved: &str) -> Option<&'a Station> {
    stations
        .iter()
        .find(|s| s.code.eq_ignore_ascii_case(saved))
        .or_else(|| stations.iter().find(|s| s.is_active))
        .or_else(|| stations.first())
}
