//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where the
//! player controller, the station directory and the event bridge are
//! instantiated and wired together.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::error::{TunerError, TunerResult};
use crate::events::{BroadcastEventBridge, EventEmitter};
use crate::playback::{EngineFactory, PlaybackDevice, PlayerController};
use crate::protocol_constants::{APP_NAME, CATALOG_TIMEOUT_SECS};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::state::PlayerConfig;
use crate::station::{
    HttpStationCatalog, LastStationStore, Station, StationCatalog, StationDirectory,
};

/// Host-provided playback backends.
pub struct PlayerBackends {
    /// The device that produces audio.
    pub device: Arc<dyn PlaybackDevice>,
    /// Factory for adaptive-streaming engines.
    pub engines: Arc<dyn EngineFactory>,
}

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedPlayer {
    /// Playback command surface.
    pub controller: Arc<PlayerController>,
    /// Station list and selection.
    pub stations: Arc<StationDirectory>,
    /// Event bridge front-ends subscribe to.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
    http_client: Client,
}

impl BootstrappedPlayer {
    /// Returns the shared HTTP client.
    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    /// Loads the station catalog and attaches the restored station.
    ///
    /// Playback does not start; that takes an explicit play command.
    pub async fn start(&self) -> Option<Station> {
        let station = self.stations.load().await;
        self.controller
            .set_stream(station.as_ref().map(Station::descriptor));
        station
    }

    /// Switches to the station with `code` and attaches its stream.
    pub fn tune(&self, code: &str) -> TunerResult<Station> {
        let station = self.stations.change_station(code)?;
        self.controller.set_stream(Some(station.descriptor()));
        Ok(station)
    }

    /// Stops the event loop and tears down the session.
    pub fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");
        self.controller.shutdown();
        self.cancel_token.cancel();
        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Creates the shared HTTP client for catalog requests.
fn create_http_client() -> TunerResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(CATALOG_TIMEOUT_SECS))
        .user_agent(format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| TunerError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Bootstraps the player against the HTTP station catalog in `config`.
///
/// `data_dir` enables persistence of the selected station.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the HTTP client
/// cannot be built.
pub fn bootstrap_player(
    config: &PlayerConfig,
    backends: PlayerBackends,
    data_dir: Option<&Path>,
) -> TunerResult<BootstrappedPlayer> {
    let http_client = create_http_client()?;
    let catalog = Arc::new(HttpStationCatalog::new(
        http_client.clone(),
        config.catalog_url.clone(),
    ));
    bootstrap_player_with_catalog(config, backends, catalog, data_dir, http_client)
}

/// Bootstraps the player with an explicit station catalog.
///
/// Wiring order:
///
/// 1. Shared infrastructure (spawner, event bridge, cancellation token)
/// 2. Player controller, whose event loop is spawned immediately
/// 3. Station directory (depends on catalog, store, event bridge)
pub fn bootstrap_player_with_catalog(
    config: &PlayerConfig,
    backends: PlayerBackends,
    catalog: Arc<dyn StationCatalog>,
    data_dir: Option<&Path>,
    http_client: Client,
) -> TunerResult<BootstrappedPlayer> {
    config.validate().map_err(TunerError::Configuration)?;

    let spawner = TokioSpawner::current();
    let event_bridge = Arc::new(BroadcastEventBridge::new(config.event_channel_capacity));
    let cancel_token = CancellationToken::new();

    let (controller, inbox) = PlayerController::new(
        backends.device,
        backends.engines,
        config,
        Arc::clone(&event_bridge) as Arc<dyn EventEmitter>,
        spawner.clone(),
    );
    let controller = Arc::new(controller);
    spawner.spawn(Arc::clone(&controller).run(inbox, cancel_token.clone()));

    let store = data_dir.map(|dir| {
        log::info!("[Bootstrap] Persisting station selection in {}", dir.display());
        LastStationStore::new(dir, config.default_station_code.clone())
    });
    let stations = Arc::new(StationDirectory::new(
        catalog,
        store,
        config.default_station_code.clone(),
        Arc::clone(&event_bridge) as Arc<dyn EventEmitter>,
    ));

    Ok(BootstrappedPlayer {
        controller,
        stations,
        event_bridge,
        spawner,
        cancel_token,
        http_client,
    })
}
