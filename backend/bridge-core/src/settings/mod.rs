//! Persisted user settings, using the actor pattern.
//!
//! Reads go through an `Arc<RwLock<AppConfig>>`. Updates are serialized by a
//! dedicated task that validates the merged settings, updates memory, then
//! writes `settings.json`. The actor is spawned lazily on the first update.

use crate::config::AppConfig;
use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};

/// Commands that mutate settings.
#[derive(Debug)]
pub enum SettingsCommand {
    /// Deep-merge a JSON patch, validate, update memory and save.
    Update {
        patch: Value,
        reply: oneshot::Sender<Result<AppConfig, ConfigError>>,
    },
}

/// Settings store handle.
///
/// # Thread Safety
///
/// This type is `Clone`; all clones share the same settings.
#[derive(Clone)]
pub struct SettingsStore {
    command_tx: Arc<Mutex<Option<mpsc::Sender<SettingsCommand>>>>,
    settings: Arc<RwLock<AppConfig>>,
    config_dir: Arc<PathBuf>,
    actor_init: Arc<Mutex<bool>>,
}

impl SettingsStore {
    /// # Arguments
    ///
    /// * `config_dir` - Directory holding settings.json
    /// * `settings` - Settings loaded at startup
    pub fn new(config_dir: PathBuf, settings: AppConfig) -> Self {
        Self {
            command_tx: Arc::new(Mutex::new(None)),
            settings: Arc::new(RwLock::new(settings)),
            config_dir: Arc::new(config_dir),
            actor_init: Arc::new(Mutex::new(false)),
        }
    }

    /// Load settings.json from `config_dir` (defaults if missing).
    pub fn load(config_dir: PathBuf) -> Result<Self, ConfigError> {
        let settings = AppConfig::load(&config_dir)?;
        Ok(Self::new(config_dir, settings))
    }

    /// Apply a settings patch. The patch is rejected as a whole if the merged
    /// settings are invalid; nothing is changed in that case.
    ///
    /// Returns the settings now in effect.
    pub async fn update(&self, patch: Value) -> Result<AppConfig, ConfigError> {
        self.ensure_actor().await;

        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let tx_guard = self.command_tx.lock().await;
            let tx = tx_guard.as_ref().ok_or_else(|| ConfigError::Unavailable {
                location: ErrorLocation::from(Location::caller()),
                reason: "Settings actor not initialized".to_string(),
            })?;

            tx.send(SettingsCommand::Update {
                patch,
                reply: reply_tx,
            })
            .await
            .map_err(|e| ConfigError::Unavailable {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Settings actor died: {}", e),
            })?;
        }

        reply_rx.await.map_err(|e| ConfigError::Unavailable {
            location: ErrorLocation::from(Location::caller()),
            reason: format!("Settings actor dropped reply: {}", e),
        })?
    }

    /// Current settings (read-only copy).
    pub async fn get(&self) -> AppConfig {
        self.settings.read().await.clone()
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    async fn ensure_actor(&self) {
        let mut init_guard = self.actor_init.lock().await;
        if !*init_guard {
            let (tx, rx) = mpsc::channel(32);
            let settings_clone = Arc::clone(&self.settings);
            let config_dir_clone = Arc::clone(&self.config_dir);

            // Store tx before spawning
            let mut tx_guard = self.command_tx.lock().await;
            *tx_guard = Some(tx);
            drop(tx_guard);

            tokio::spawn(settings_actor(rx, settings_clone, config_dir_clone));

            *init_guard = true;
            info!("Settings actor spawned");
        }
    }
}

async fn settings_actor(
    mut command_rx: mpsc::Receiver<SettingsCommand>,
    settings: Arc<RwLock<AppConfig>>,
    config_dir: Arc<PathBuf>,
) {
    info!("Settings actor started");

    while let Some(cmd) = command_rx.recv().await {
        match cmd {
            SettingsCommand::Update { patch, reply } => {
                let current = settings.read().await.clone();

                let updated = match current.apply_patch(&patch) {
                    Ok(updated) => updated,
                    Err(e) => {
                        warn!("Rejected settings patch: {}", e);
                        let _ = reply.send(Err(e));
                        continue;
                    }
                };

                {
                    let mut settings_write = settings.write().await;
                    *settings_write = updated.clone();
                }
                info!("Settings updated in memory");

                // Memory stays updated even if the write fails.
                match updated.save(&config_dir) {
                    Ok(()) => info!("Settings saved to disk"),
                    Err(e) => error!("Settings updated in memory but disk write failed: {}", e),
                }

                let _ = reply.send(Ok(updated));
            }
        }
    }

    info!("Settings actor stopped");
}
