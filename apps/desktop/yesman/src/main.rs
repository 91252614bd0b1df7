use yesman::error::YesmanError;
use yesman::host::FaceHost;
use yesman::logger::{ENV_LOG_LEVEL, initialize as LoggerInitialize, level_from};
use yesman::paths;

use bridge_core::config::BridgeConfig;
use bridge_core::settings::SettingsStore;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;

use log::{debug, info};

#[tokio::main]
async fn main() -> Result<(), YesmanError> {
    // Environment first: it can move the log and config directories.
    let dotenv = dotenvy::dotenv();

    let log_dir = paths::log_dir()?;
    create_dir_all(&log_dir).map_err(|e| YesmanError::Yesman {
        message: format!("Failed to create log directory {}: {}", log_dir.display(), e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    let level = level_from(std::env::var(ENV_LOG_LEVEL).ok().as_deref());
    LoggerInitialize(&log_dir, level)?;

    info!("Yes-Man face host starting");
    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env loaded: {}", e),
    }

    let config_dir = paths::config_dir()?;
    info!("Config directory: {}", config_dir.display());

    let mut bridge_config = BridgeConfig::load(&config_dir)?;
    bridge_config.apply_env()?;

    let settings = SettingsStore::load(config_dir)?;
    let host = FaceHost::new(bridge_config, settings).await;
    host.start();

    tokio::signal::ctrl_c().await.map_err(|e| YesmanError::Yesman {
        message: format!("Failed to listen for shutdown signal: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let status = host.get_status();
    info!(
        "Shutdown requested ({}, face {}/{}, sent {}, received {})",
        status.connection.status,
        status.face.phase,
        status.face.expression,
        status.stats.sent,
        status.stats.received
    );

    host.shutdown().await;
    info!("Yes-Man face host stopped");
    Ok(())
}
