pub mod bridge;

pub use bridge::BridgeConfig;

use crate::error::config::ConfigError;

use common::ErrorLocation;
use models::ParameterOverrides;

use std::panic::Location;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SETTINGS_FILE_NAME: &str = "settings.json";
const SETTINGS_VERSION: u32 = 1;

// ============================================
// ENUMS WITH DEFAULTS
// ============================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FaceSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnimationQuality {
    Low,
    Medium,
    #[default]
    High,
}

// ============================================
// SETTINGS STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    #[serde(default = "default_speaker_id")]
    pub voicevox_speaker_id: u32,
    #[serde(default = "default_speech_speed")]
    pub speech_speed: f32,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voicevox_speaker_id: default_speaker_id(),
            speech_speed: default_speech_speed(),
            volume: default_volume(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    #[serde(default)]
    pub face_size: FaceSize,
    #[serde(default)]
    pub animation_quality: AnimationQuality,
    #[serde(default)]
    pub always_on_top: bool,
    /// Parameter overrides applied to the face at startup.
    #[serde(default)]
    pub overrides: ParameterOverrides,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorSettings {
    #[serde(default = "default_wake_word_sensitivity")]
    pub wake_word_sensitivity: f32,
    /// Echo every face change back to the core as `face_state_change`.
    #[serde(default = "default_echo_face_state")]
    pub echo_face_state: bool,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            wake_word_sensitivity: default_wake_word_sensitivity(),
            echo_face_state: default_echo_face_state(),
        }
    }
}

/// User settings persisted as `settings.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub voice: VoiceSettings,

    #[serde(default)]
    pub display: DisplaySettings,

    #[serde(default)]
    pub behavior: BehaviorSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            voice: VoiceSettings::default(),
            display: DisplaySettings::default(),
            behavior: BehaviorSettings::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    SETTINGS_VERSION
}
fn default_speaker_id() -> u32 {
    1
}
fn default_speech_speed() -> f32 {
    1.0
}
fn default_volume() -> f32 {
    0.8
}
fn default_wake_word_sensitivity() -> f32 {
    0.8
}
fn default_echo_face_state() -> bool {
    true
}

// ============================================
// IMPLEMENTATION
// ============================================

impl AppConfig {
    /// Load settings from {config_dir}/settings.json.
    ///
    /// # Returns
    ///
    /// Returns `Ok(AppConfig)` if loaded successfully or defaults if file missing.
    /// Returns `Err(ConfigError)` if file exists but is corrupted/invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let settings_path = config_dir.join(SETTINGS_FILE_NAME);

        if !settings_path.exists() {
            info!(
                "Settings file not found at {}, using defaults",
                settings_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
            warn!("Failed to read settings file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: settings_path.clone(),
                source: e,
            }
        })?;

        let settings: AppConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse settings JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: settings_path.clone(),
                reason: e.to_string(),
            }
        })?;

        settings.validate()?;

        info!("Settings loaded from {}", settings_path.display());
        Ok(settings)
    }

    /// Save settings to {config_dir}/settings.json using temp file + rename.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - Validation fails
    /// - Directory creation fails
    /// - Serialization fails
    /// - Write or rename fails
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let settings_path = config_dir.join(SETTINGS_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", SETTINGS_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &settings_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: settings_path.clone(),
            source: e,
        })?;

        info!("Settings saved to {}", settings_path.display());
        Ok(())
    }

    /// Validate setting values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > SETTINGS_VERSION {
            return Err(validation_error(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, SETTINGS_VERSION
            )));
        }

        check_range("voice.speech_speed", self.voice.speech_speed, 0.5, 2.0)?;
        check_range("voice.volume", self.voice.volume, 0.0, 1.0)?;
        check_range(
            "behavior.wake_word_sensitivity",
            self.behavior.wake_word_sensitivity,
            0.5,
            1.0,
        )?;

        self.display
            .overrides
            .validate()
            .map_err(|e| validation_error(e.to_string()))?;

        Ok(())
    }

    /// Deep-merge a JSON patch into a copy of these settings.
    ///
    /// The whole patch is rejected if the merged result does not deserialize or
    /// fails validation; `self` is never modified.
    pub fn apply_patch(&self, patch: &Value) -> Result<Self, ConfigError> {
        if !patch.is_object() {
            return Err(validation_error(String::from(
                "Settings patch must be a JSON object",
            )));
        }

        let mut merged = serde_json::to_value(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;
        merge_json(&mut merged, patch);

        let updated: AppConfig =
            serde_json::from_value(merged).map_err(|e| validation_error(e.to_string()))?;
        updated.validate()?;

        Ok(updated)
    }
}

fn merge_json(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_json(existing, value);
                    }
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[track_caller]
fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if !(min..=max).contains(&value) {
        return Err(validation_error(format!(
            "Invalid {name}: {value} (must be {min:.1}-{max:.1})"
        )));
    }
    Ok(())
}

#[track_caller]
fn validation_error(reason: String) -> ConfigError {
    ConfigError::ValidationError {
        location: ErrorLocation::from(Location::caller()),
        reason,
    }
}
