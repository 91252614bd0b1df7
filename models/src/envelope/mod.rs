//! Message envelopes exchanged with the processing core.

pub mod builder;
pub mod kind;
pub mod payload;

use crate::envelope::kind::MessageKind;
use crate::envelope::payload::Payload;

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::time::SystemTime;
use uuid::Uuid;

/// Producer side of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[serde(alias = "python")]
    Core,
    #[serde(alias = "electron")]
    Client,
}

impl Origin {
    /// Parse a wire `source` value, accepting the legacy producer names.
    pub fn parse(source: &str) -> Option<Self> {
        match source {
            "core" | "python" => Some(Origin::Core),
            "client" | "electron" => Some(Origin::Client),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Origin::Core => "core",
            Origin::Client => "client",
        }
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(self.as_str())
    }
}

/// A typed, timestamped, identified message.
///
/// `id` is unique per envelope and used only for diagnostics. Ordering is the
/// channel's job, never the id's.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub id: String,
    pub timestamp: SystemTime,
    pub origin: Origin,
    pub payload: Payload,
}

impl Envelope {
    /// New envelope stamped with a fresh id and the current time.
    pub fn new(origin: Origin, payload: Payload) -> Self {
        Self {
            id: new_envelope_id(),
            timestamp: SystemTime::now(),
            origin,
            payload,
        }
    }

    pub fn client(payload: Payload) -> Self {
        Self::new(Origin::Client, payload)
    }

    pub fn core(payload: Payload) -> Self {
        Self::new(Origin::Core, payload)
    }

    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }
}

pub fn new_envelope_id() -> String {
    Uuid::new_v4().to_string()
}
