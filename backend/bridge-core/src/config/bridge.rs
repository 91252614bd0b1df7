use crate::CORE_URL;
use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

pub const BRIDGE_FILE_NAME: &str = "bridge.toml";

pub const ENV_CORE_URL: &str = "YESMAN_CORE_URL";
pub const ENV_HEARTBEAT_INTERVAL_MS: &str = "YESMAN_HEARTBEAT_INTERVAL_MS";
pub const ENV_RECONNECT_MAX_ATTEMPTS: &str = "YESMAN_RECONNECT_MAX_ATTEMPTS";

// ============================================
// BRIDGE CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreSection {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for CoreSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessSection {
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Silence longer than `heartbeat_interval_ms * timeout_multiplier` closes the link.
    #[serde(default = "default_timeout_multiplier")]
    pub timeout_multiplier: u32,
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
}

impl Default for LivenessSection {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            timeout_multiplier: default_timeout_multiplier(),
            check_interval_ms: default_check_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectSection {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Randomization factor passed to the backoff (0.0 disables jitter).
    #[serde(default)]
    pub jitter: f64,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_attempts: default_max_attempts(),
            max_delay_ms: default_max_delay_ms(),
            jitter: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSection {
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
        }
    }
}

/// Transport settings read from `bridge.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub core: CoreSection,
    #[serde(default)]
    pub liveness: LivenessSection,
    #[serde(default)]
    pub reconnect: ReconnectSection,
    #[serde(default)]
    pub queue: QueueSection,
}

fn default_url() -> String {
    CORE_URL.to_string()
}
fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_heartbeat_interval_ms() -> u64 {
    10_000
}
fn default_timeout_multiplier() -> u32 {
    3
}
fn default_check_interval_ms() -> u64 {
    1_000
}
fn default_base_delay_ms() -> u64 {
    3_000
}
fn default_multiplier() -> f64 {
    1.5
}
fn default_max_attempts() -> u32 {
    10
}
fn default_max_delay_ms() -> u64 {
    60_000
}
fn default_queue_capacity() -> usize {
    2048
}

// ============================================
// IMPLEMENTATION
// ============================================

impl BridgeConfig {
    /// Config pointing at a specific core URL, everything else default.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            core: CoreSection {
                url: url.into(),
                ..CoreSection::default()
            },
            ..Self::default()
        }
    }

    /// Load bridge.toml from a config directory.
    ///
    /// Tries:
    /// 1. {config_dir}/config/bridge.toml
    /// 2. {config_dir}/bridge.toml
    /// 3. Falls back to defaults
    ///
    /// # Returns
    ///
    /// Always returns `Ok(BridgeConfig)` - either loaded or default.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let paths = [
            config_dir.join("config").join(BRIDGE_FILE_NAME),
            config_dir.join(BRIDGE_FILE_NAME),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load_from_path(path) {
                    Ok(config) => {
                        info!("Bridge config loaded from {}", path.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        warn!("Failed to load bridge config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        info!("No bridge.toml found in {}, using defaults", config_dir.display());
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: BridgeConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `YESMAN_*` environment overrides, then re-validate.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_CORE_URL) {
            info!("Core URL overridden by {ENV_CORE_URL}: {url}");
            self.core.url = url;
        }

        if let Some(raw) = lookup(ENV_HEARTBEAT_INTERVAL_MS) {
            self.liveness.heartbeat_interval_ms =
                raw.trim().parse().map_err(|_| ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("{ENV_HEARTBEAT_INTERVAL_MS} is not a number: {raw}"),
                })?;
        }

        if let Some(raw) = lookup(ENV_RECONNECT_MAX_ATTEMPTS) {
            self.reconnect.max_attempts =
                raw.trim().parse().map_err(|_| ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("{ENV_RECONNECT_MAX_ATTEMPTS} is not a number: {raw}"),
                })?;
        }

        self.validate()
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.core.url).map_err(|e| ConfigError::ValidationError {
            location: ErrorLocation::from(Location::caller()),
            reason: format!("Invalid core URL {}: {}", self.core.url, e),
        })?;

        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Core URL must use ws:// or wss://, got {}", self.core.url),
            });
        }

        let positive = [
            ("core.connect_timeout_ms", self.core.connect_timeout_ms),
            ("liveness.heartbeat_interval_ms", self.liveness.heartbeat_interval_ms),
            ("liveness.check_interval_ms", self.liveness.check_interval_ms),
            ("reconnect.base_delay_ms", self.reconnect.base_delay_ms),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("{name} must be greater than zero"),
                });
            }
        }

        if self.liveness.timeout_multiplier == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("liveness.timeout_multiplier must be at least 1"),
            });
        }

        if !self.reconnect.multiplier.is_finite() || self.reconnect.multiplier < 1.0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "reconnect.multiplier must be >= 1.0, got {}",
                    self.reconnect.multiplier
                ),
            });
        }

        if self.reconnect.max_delay_ms < self.reconnect.base_delay_ms {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "reconnect.max_delay_ms ({}) is below base_delay_ms ({})",
                    self.reconnect.max_delay_ms, self.reconnect.base_delay_ms
                ),
            });
        }

        if !(0.0..=1.0).contains(&self.reconnect.jitter) {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("reconnect.jitter must be 0.0-1.0, got {}", self.reconnect.jitter),
            });
        }

        if self.queue.capacity == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("queue.capacity must be greater than zero"),
            });
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.core.connect_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.liveness.heartbeat_interval_ms)
    }

    pub fn liveness_timeout(&self) -> Duration {
        self.heartbeat_interval() * self.liveness.timeout_multiplier
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.liveness.check_interval_ms)
    }
}
