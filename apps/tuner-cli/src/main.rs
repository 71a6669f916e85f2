//! Tuner CLI - headless front-end for the live radio tuner.
//!
//! Lists stations from the catalog, or tunes into one and follows its HLS
//! playlist while logging playback status and fault messages until Ctrl+C.

mod config;
mod headless;
mod hls;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast;
use tuner_core::station::fetch_or_fallback;
use tuner_core::{
    bootstrap_player, normalize_station_code, BroadcastEvent, HttpStationCatalog,
    LoggingEventEmitter, PlaybackStatus, PlayerBackends, PlayerEvent, StationEvent,
};

use crate::config::CliConfig;
use crate::headless::HeadlessDevice;
use crate::hls::ManifestProbeFactory;

/// How long `listen` waits for the stream to become playable before autoplay.
const READY_TIMEOUT: Duration = Duration::from_secs(20);

/// Tuner - headless live radio player.
#[derive(Parser, Debug)]
#[command(name = "tuner")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "TUNER_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Station catalog URL (overrides config file).
    #[arg(long)]
    catalog_url: Option<String>,

    /// Data directory for persistent state (last station).
    #[arg(short = 'd', long, env = "TUNER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available stations.
    Stations,

    /// Tune into a station and follow it until interrupted.
    Listen {
        /// Station code (defaults to the last selected station).
        #[arg(short, long)]
        station: Option<String>,

        /// Volume 0-100 (out-of-range values are clamped).
        #[arg(short, long, allow_negative_numbers = true)]
        volume: Option<i64>,

        /// Attach the stream without starting playback.
        #[arg(long)]
        no_autoplay: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Tuner v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        CliConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(url) = args.catalog_url {
        config.catalog_url = url;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = Some(data_dir);
    }

    log::info!("Configuration: catalog_url={}", config.catalog_url);

    match args.command {
        Command::Stations => list_stations(&config).await,
        Command::Listen {
            station,
            volume,
            no_autoplay,
        } => listen(&config, station, volume, !no_autoplay).await,
    }
}

async fn list_stations(config: &CliConfig) -> Result<()> {
    let catalog = HttpStationCatalog::new(reqwest::Client::new(), config.catalog_url.clone());
    let (stations, fallback) = fetch_or_fallback(&catalog).await;

    if fallback {
        println!("(catalog unreachable, showing built-in station)");
    }
    for station in stations {
        println!(
            "{:<10} {:<28} {:<6} {}",
            station.code,
            station.name,
            if station.is_active { "active" } else { "-" },
            station.stream_url
        );
    }
    Ok(())
}

async fn listen(
    config: &CliConfig,
    station: Option<String>,
    volume: Option<i64>,
    autoplay: bool,
) -> Result<()> {
    let core_config = config.to_core_config();
    let backends = PlayerBackends {
        device: Arc::new(HeadlessDevice::new()),
        engines: Arc::new(ManifestProbeFactory::new(
            reqwest::Client::new(),
            tokio::runtime::Handle::current(),
        )),
    };

    if let Some(ref data_dir) = config.data_dir {
        log::info!("Using data directory: {}", data_dir.display());
    } else {
        log::info!("No data directory configured - station selection will not persist");
    }

    let services = bootstrap_player(&core_config, backends, config.data_dir.as_deref())
        .context("Failed to bootstrap player")?;
    services
        .event_bridge
        .set_external_emitter(Arc::new(LoggingEventEmitter));
    let mut events = services.event_bridge.subscribe();

    log::info!("Player bootstrapped successfully");

    // Restore the last station, then switch if one was requested
    services.start().await;
    if let Some(code) = station {
        services
            .tune(&normalize_station_code(&code))
            .with_context(|| format!("Unknown station: {}", code))?;
    }
    if let Some(volume) = volume {
        services.controller.set_volume(volume);
    }

    if autoplay {
        match wait_for_ready(&mut events, READY_TIMEOUT).await {
            Some(PlaybackStatus::Ready) => {
                let status = services.controller.toggle_play().await?;
                log::info!("Playback requested, status {}", status.label());
            }
            Some(status) => log::warn!("Not starting playback, stream is {}", status.label()),
            None => log::warn!("Stream did not become ready within {:?}", READY_TIMEOUT),
        }
    }

    let reporter = tokio::spawn(report_events(events));

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");
    services.shutdown();
    reporter.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits until the player settles on `ready` or `error`.
async fn wait_for_ready(
    events: &mut broadcast::Receiver<BroadcastEvent>,
    timeout: Duration,
) -> Option<PlaybackStatus> {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(BroadcastEvent::Player(PlayerEvent::StatusChanged { to, .. }))
                    if matches!(to, PlaybackStatus::Ready | PlaybackStatus::Error) =>
                {
                    return Some(to);
                }
                Ok(event) => log_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("Skipped {} event(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    };
    tokio::time::timeout(timeout, wait).await.ok().flatten()
}

/// Logs player and station events until the channel closes.
async fn report_events(mut events: broadcast::Receiver<BroadcastEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => log_event(&event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::debug!("Skipped {} event(s)", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn log_event(event: &BroadcastEvent) {
    match event {
        BroadcastEvent::Player(PlayerEvent::StatusChanged { label, .. }) => {
            log::info!("[Tuner] Status: {}", label);
        }
        BroadcastEvent::Player(PlayerEvent::FaultRaised { record }) => {
            log::warn!("[Tuner] {} ({})", record.message, record.fault);
        }
        BroadcastEvent::Player(PlayerEvent::VolumeChanged { volume, .. }) => {
            log::info!("[Tuner] Volume: {}%", volume);
        }
        BroadcastEvent::Station(StationEvent::Selected { code, name, .. }) => {
            log::info!("[Tuner] Station: {} ({})", name, code);
        }
        other => log::debug!("[Tuner] {:?}", other),
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
