//! JSON wire codec for envelopes.
//!
//! Frames look like the core emits them:
//! `{"type": "...", "data": {...}, "timestamp": "...", "source": "...", "id": "..."}`.
//! Unknown `type` values decode to [`Decoded::Unknown`] so the channel can log and
//! skip them without treating the frame as malformed.

use crate::error::protocol::ProtocolError;

use common::ErrorLocation;
use models::envelope::new_envelope_id;
use models::{Envelope, MessageKind, Origin, Payload};

use std::panic::Location;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
struct WireEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

/// Result of decoding one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Envelope(Envelope),
    /// Well-formed frame with a kind outside the vocabulary.
    Unknown { kind: String, id: Option<String> },
}

/// Encode an envelope into a text frame.
pub fn encode(envelope: &Envelope) -> Result<String, ProtocolError> {
    let data = envelope
        .payload
        .to_data()
        .map_err(|e| ProtocolError::Encode {
            message: format!("{} payload: {}", envelope.kind(), e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let wire = WireEnvelope {
        kind: envelope.kind().as_str().to_string(),
        data,
        timestamp: Some(Value::String(
            humantime::format_rfc3339_millis(envelope.timestamp).to_string(),
        )),
        source: Some(envelope.origin.as_str().to_string()),
        id: Some(envelope.id.clone()),
    };

    serde_json::to_string(&wire).map_err(|e| ProtocolError::Encode {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Decode a text frame.
///
/// `fallback_origin` is used when `source` is missing or unrecognised. A missing
/// or unparseable timestamp becomes the receive time and a missing id is
/// replaced by a fresh one.
pub fn decode(text: &str, fallback_origin: Origin) -> Result<Decoded, ProtocolError> {
    let wire: WireEnvelope = serde_json::from_str(text)?;

    let Some(kind) = MessageKind::parse(&wire.kind) else {
        return Ok(Decoded::Unknown {
            kind: wire.kind,
            id: wire.id,
        });
    };

    let payload = Payload::from_data(kind, wire.data).map_err(|e| ProtocolError::Payload {
        kind: wire.kind.clone(),
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let origin = wire
        .source
        .as_deref()
        .and_then(Origin::parse)
        .unwrap_or(fallback_origin);

    let id = wire
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(new_envelope_id);

    let timestamp = wire
        .timestamp
        .as_ref()
        .and_then(parse_timestamp)
        .unwrap_or_else(SystemTime::now);

    Ok(Decoded::Envelope(Envelope {
        id,
        timestamp,
        origin,
        payload,
    }))
}

/// RFC 3339 strings (timezone optional) or epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<SystemTime> {
    match value {
        Value::String(text) => humantime::parse_rfc3339_weak(text).ok(),
        Value::Number(number) => number
            .as_u64()
            .map(|millis| UNIX_EPOCH + Duration::from_millis(millis)),
        _ => None,
    }
}
