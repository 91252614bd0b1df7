use common::ErrorLocation;
use models::ModelError;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum FaceError {
    #[error("Face Store Stopped Error: {message} {location}")]
    Stopped {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Override Error: {message} {location}")]
    InvalidOverride {
        message: String,
        location: ErrorLocation,
    },
}

impl From<ModelError> for FaceError {
    #[track_caller]
    fn from(error: ModelError) -> Self {
        FaceError::InvalidOverride {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
