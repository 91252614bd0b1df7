use crate::envelope::payload::Payload;
use crate::envelope::{Envelope, Origin, new_envelope_id};
use crate::error::model_error::ModelError;
use crate::ErrorLocation;

use std::panic::Location;
use std::time::SystemTime;

/// Builder for creating validated envelopes.
///
/// Id and timestamp are optional and default to a fresh uuid and the current
/// time. Origin and payload are required.
#[derive(Debug, Default)]
pub struct EnvelopeBuilder {
    id: Option<String>,
    timestamp: Option<SystemTime>,
    origin: Option<Origin>,
    payload: Option<Payload>,
}

impl EnvelopeBuilder {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Build the envelope with validation.
    #[track_caller]
    pub fn build(self) -> Result<Envelope, ModelError> {
        let id = self.id.unwrap_or_else(new_envelope_id);

        if id.trim().is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Envelope id cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let origin = self.origin.ok_or_else(|| ModelError::Validation {
            message: String::from("Origin is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let payload = self.payload.ok_or_else(|| ModelError::Validation {
            message: String::from("Payload is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(Envelope {
            id,
            timestamp: self.timestamp.unwrap_or_else(SystemTime::now),
            origin,
            payload,
        })
    }
}
