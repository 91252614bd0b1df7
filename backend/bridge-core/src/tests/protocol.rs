use crate::error::protocol::ProtocolError;
use crate::protocol::{Decoded, decode, encode};

use models::{
    AgentResponse, Envelope, EnvelopeBuilder, FaceStateChange, MessageKind, Origin, Payload,
    Expression, Phase, SystemStatus,
};

use std::time::{Duration, UNIX_EPOCH};

use serde_json::{Value, json};

/// **VALUE**: Verifies an encoded envelope carries every logical field under its wire name.
///
/// **WHY THIS MATTERS**: The core reads `type`, `data`, `timestamp`, `source` and `id`.
///
/// **BUG THIS CATCHES**: Would catch a renamed wire field or a missing id.
#[test]
fn given_face_state_change_when_encoded_then_wire_fields_present() {
    // GIVEN: An outbound face state change
    let envelope = EnvelopeBuilder::default()
        .with_id("face-1")
        .with_timestamp(UNIX_EPOCH + Duration::from_millis(1_700_000_000_123))
        .with_origin(Origin::Client)
        .with_payload(Payload::FaceStateChange(FaceStateChange {
            state: Phase::Thinking,
            expression: Expression::Neutral,
        }))
        .build()
        .expect("valid envelope");

    // WHEN: Encoding
    let text = encode(&envelope).expect("encodable");
    let wire: Value = serde_json::from_str(&text).expect("valid JSON");

    // THEN: Wire shape matches
    assert_eq!(wire["type"], "face_state_change");
    assert_eq!(wire["data"], json!({"state": "thinking", "expression": "neutral"}));
    assert_eq!(wire["source"], "client");
    assert_eq!(wire["id"], "face-1");
    assert_eq!(wire["timestamp"], "2023-11-14T22:13:20.123Z");
}

/// **VALUE**: Verifies decode restores the same logical envelope that was encoded.
#[test]
fn given_encoded_envelope_when_decoded_then_logical_fields_preserved() {
    // GIVEN: An agent response with a millisecond timestamp
    let envelope = EnvelopeBuilder::default()
        .with_timestamp(UNIX_EPOCH + Duration::from_millis(1_700_000_000_500))
        .with_origin(Origin::Core)
        .with_payload(Payload::AgentResponse(AgentResponse {
            text: String::from("こんにちは"),
            execution_time_ms: 1200,
            session_id: String::from("s-9"),
        }))
        .build()
        .expect("valid envelope");

    // WHEN: Encoding then decoding
    let text = encode(&envelope).expect("encodable");
    let decoded = decode(&text, Origin::Client).expect("decodable");

    // THEN: Same envelope
    assert_eq!(decoded, Decoded::Envelope(envelope));
}

/// **VALUE**: Verifies frames from the original core shape decode.
///
/// **WHY THIS MATTERS**: The core labels itself `python`, omits the timezone on its
/// timestamps and sometimes sends `data: null`.
///
/// **BUG THIS CATCHES**: Would catch a strict timestamp parser or origin matcher that
/// turns every real frame into a decode error.
#[test]
fn given_legacy_core_frame_when_decoded_then_origin_and_timestamp_parsed() {
    // GIVEN: A frame as the core emits it
    let text = r#"{"type":"tts_end","data":null,"timestamp":"2024-05-01T10:20:30.250","source":"python","id":"abc"}"#;

    // WHEN: Decoding
    let decoded = decode(text, Origin::Client).expect("decodable");

    // THEN: Origin maps to core and timestamp is honoured
    match decoded {
        Decoded::Envelope(envelope) => {
            assert_eq!(envelope.kind(), MessageKind::TtsEnd);
            assert_eq!(envelope.origin, Origin::Core);
            assert_eq!(envelope.id, "abc");
            let expected = humantime::parse_rfc3339("2024-05-01T10:20:30.250Z").expect("valid");
            assert_eq!(envelope.timestamp, expected);
        }
        other => panic!("Expected envelope, got {other:?}"),
    }
}

/// **VALUE**: Verifies missing optional envelope fields are filled in locally.
///
/// **BUG THIS CATCHES**: Would catch an empty id leaking into the system.
#[test]
fn given_frame_without_id_source_or_timestamp_when_decoded_then_defaults_applied() {
    let decoded = decode(r#"{"type":"heartbeat"}"#, Origin::Core).expect("decodable");

    match decoded {
        Decoded::Envelope(envelope) => {
            assert_eq!(envelope.kind(), MessageKind::Heartbeat);
            assert_eq!(envelope.origin, Origin::Core);
            assert!(!envelope.id.is_empty());
        }
        other => panic!("Expected envelope, got {other:?}"),
    }
}

/// **VALUE**: Verifies unknown kinds are reported, not rejected.
///
/// **WHY THIS MATTERS**: A newer core adding `audio_level` frames must not be treated as
/// malformed traffic.
///
/// **BUG THIS CATCHES**: Would catch unknown kinds surfacing as decode errors.
#[test]
fn given_unknown_kind_when_decoded_then_returns_unknown() {
    let decoded = decode(
        r#"{"type":"audio_level","data":{"rms":0.2},"id":"x-1"}"#,
        Origin::Core,
    )
    .expect("unknown kinds are not errors");

    assert_eq!(
        decoded,
        Decoded::Unknown {
            kind: String::from("audio_level"),
            id: Some(String::from("x-1")),
        }
    );
}

/// **VALUE**: Verifies malformed frames and bad payloads are errors with distinct variants.
#[test]
fn given_malformed_frames_when_decoded_then_returns_matching_errors() {
    // Not JSON
    assert!(matches!(
        decode("not json", Origin::Core),
        Err(ProtocolError::Decode { .. })
    ));

    // No type
    assert!(matches!(
        decode(r#"{"data":{}}"#, Origin::Core),
        Err(ProtocolError::Decode { .. })
    ));

    // Known kind, wrong payload shape
    match decode(r#"{"type":"agent_response","data":{"text":42}}"#, Origin::Core) {
        Err(ProtocolError::Payload { kind, .. }) => assert_eq!(kind, "agent_response"),
        other => panic!("Expected payload error, got {other:?}"),
    }
}

/// **VALUE**: Verifies epoch-millisecond timestamps are accepted.
#[test]
fn given_numeric_timestamp_when_decoded_then_interpreted_as_epoch_millis() {
    let decoded = decode(
        r#"{"type":"tts_start","data":{"text":"hi"},"timestamp":1700000000000,"source":"core"}"#,
        Origin::Core,
    )
    .expect("decodable");

    match decoded {
        Decoded::Envelope(Envelope { timestamp, .. }) => {
            assert_eq!(timestamp, UNIX_EPOCH + Duration::from_millis(1_700_000_000_000));
        }
        other => panic!("Expected envelope, got {other:?}"),
    }
}

/// **VALUE**: Verifies the greeting a Python core sends on connect decodes into a
/// healthy `system_status`.
///
/// **WHY THIS MATTERS**: Every connection starts with this frame. If it fails to
/// decode, service health is never populated and the frame is counted as malformed.
///
/// **BUG THIS CATCHES**: Would catch `pythonLayerConnected` becoming required, since
/// that core only reports `*_active` flags.
#[test]
fn given_python_core_greeting_when_decoded_then_system_status_envelope() {
    // GIVEN: The greeting frame exactly as a Python core writes it
    let text = r#"{"type":"system_status","data":{"cpu_usage":0.0,"memory_usage":0.0,"whisper_active":false,"voicevox_active":true,"langflow_active":true,"wake_word_sensitivity":0.8,"last_wake_word":null,"session_count":1,"uptime":0,"timestamp":"2025-01-01T09:00:00.123456"},"timestamp":"2025-01-01T09:00:00.123456","source":"python"}"#;

    // WHEN: Decoding
    let decoded = decode(text, Origin::Client).expect("greeting should decode");

    // THEN: A core-origin status with the service flags carried over
    match decoded {
        Decoded::Envelope(envelope) => {
            assert_eq!(envelope.origin, Origin::Core);
            assert_eq!(
                envelope.payload,
                Payload::SystemStatus(SystemStatus {
                    python_layer_connected: true,
                    voicevox_connected: true,
                    langflow_connected: true,
                })
            );
        }
        other => panic!("Expected envelope, got {other:?}"),
    }
}
