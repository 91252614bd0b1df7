use bridge_core::error::CoreError;
use bridge_core::error::bridge::BridgeError;
use bridge_core::error::config::ConfigError;
use bridge_core::error::face::FaceError;

use common::ErrorLocation;

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the host process.
///
/// Lower-level errors are flattened to their message so the whole type stays
/// serializable for status reporting, while the location of the conversion is
/// kept.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum YesmanError {
    /// Error from this App
    #[error("Yesman Error: {message} {location}")]
    Yesman {
        message: String,
        location: ErrorLocation,
    },

    /// Bridge or settings configuration could not be loaded or saved
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// Transport or endpoint failure
    #[error("Bridge Error: {message} {location}")]
    Bridge {
        message: String,
        location: ErrorLocation,
    },

    /// Face store rejected a request or has stopped
    #[error("Face Error: {message} {location}")]
    Face {
        message: String,
        location: ErrorLocation,
    },
}

impl From<ConfigError> for YesmanError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        YesmanError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<BridgeError> for YesmanError {
    #[track_caller]
    fn from(error: BridgeError) -> Self {
        YesmanError::Bridge {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<FaceError> for YesmanError {
    #[track_caller]
    fn from(error: FaceError) -> Self {
        YesmanError::Face {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<CoreError> for YesmanError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Config(e) => YesmanError::from(e),
            CoreError::Bridge(e) => YesmanError::from(e),
            CoreError::Face(e) => YesmanError::from(e),
            CoreError::Protocol(e) => YesmanError::Bridge {
                message: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            },
        }
    }
}
