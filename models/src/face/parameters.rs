use crate::error::model_error::ModelError;
use crate::ErrorLocation;

use serde::{Deserialize, Serialize};
use std::panic::Location;

/// Presentation parameters derived from the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceParameters {
    pub blink_rate: f32,
    pub eye_openness: f32,
    pub mouth_movement: f32,
    pub glow_intensity: f32,
    pub pulse_speed: f32,
    pub head_tilt: f32,
}

impl FaceParameters {
    /// Head tilt has a 0.0 baseline in every phase.
    pub const fn new(
        blink_rate: f32,
        eye_openness: f32,
        mouth_movement: f32,
        glow_intensity: f32,
        pulse_speed: f32,
    ) -> Self {
        Self {
            blink_rate,
            eye_openness,
            mouth_movement,
            glow_intensity,
            pulse_speed,
            head_tilt: 0.0,
        }
    }
}

/// Parameter overrides issued by the presentation layer itself.
///
/// `None` fields fall through to the phase baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blink_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eye_openness: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mouth_movement: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glow_intensity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse_speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_tilt: Option<f32>,
}

impl ParameterOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, base: FaceParameters) -> FaceParameters {
        FaceParameters {
            blink_rate: self.blink_rate.unwrap_or(base.blink_rate),
            eye_openness: self.eye_openness.unwrap_or(base.eye_openness),
            mouth_movement: self.mouth_movement.unwrap_or(base.mouth_movement),
            glow_intensity: self.glow_intensity.unwrap_or(base.glow_intensity),
            pulse_speed: self.pulse_speed.unwrap_or(base.pulse_speed),
            head_tilt: self.head_tilt.unwrap_or(base.head_tilt),
        }
    }

    /// Rejects NaN and infinite values.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ModelError> {
        let fields = [
            ("blinkRate", self.blink_rate),
            ("eyeOpenness", self.eye_openness),
            ("mouthMovement", self.mouth_movement),
            ("glowIntensity", self.glow_intensity),
            ("pulseSpeed", self.pulse_speed),
            ("headTilt", self.head_tilt),
        ];

        for (name, value) in fields {
            if let Some(value) = value.filter(|v| !v.is_finite()) {
                return Err(ModelError::Validation {
                    message: format!("Override {name} must be finite, got {value}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        Ok(())
    }
}
