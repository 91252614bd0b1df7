use crate::{AgentResponse, LogLevel, MessageKind, Payload, SystemStatus};

use serde_json::json;

/// **VALUE**: Verifies camelCase payload fields from the core decode correctly.
///
/// **BUG THIS CATCHES**: Would catch if the rename rule changed and
/// `executionTimeMs`/`sessionId` were silently defaulted.
#[test]
fn given_camel_case_agent_response_when_decoding_then_fields_populated() {
    // GIVEN: Payload as the core emits it
    let data = json!({"text": "hi", "executionTimeMs": 420, "sessionId": "s-1"});

    // WHEN: Decoding
    let payload = Payload::from_data(MessageKind::AgentResponse, data).expect("valid payload");

    // THEN: All fields populated
    assert_eq!(
        payload,
        Payload::AgentResponse(AgentResponse {
            text: String::from("hi"),
            execution_time_ms: 420,
            session_id: String::from("s-1"),
        })
    );
}

/// **VALUE**: Verifies null data decodes for kinds with no required fields.
///
/// **WHY THIS MATTERS**: `tts_end` and `heartbeat` are often sent with `data: null`.
#[test]
fn given_null_data_when_decoding_empty_kind_then_succeeds() {
    let payload = Payload::from_data(MessageKind::TtsEnd, serde_json::Value::Null)
        .expect("null data should decode as empty");
    assert_eq!(payload.kind(), MessageKind::TtsEnd);
}

/// **VALUE**: Verifies extra fields are ignored and an explicit core flag is honored.
///
/// **BUG THIS CATCHES**: Would catch if `deny_unknown_fields` crept in, or if an
/// explicit `pythonLayerConnected: false` were overwritten by the default.
#[test]
fn given_system_status_with_extras_when_decoding_then_ignores_extras_and_keeps_core_flag() {
    // GIVEN: A status with an unknown extra field and the core flag cleared
    let with_extra = json!({
        "pythonLayerConnected": false,
        "voicevoxConnected": true,
        "langflowConnected": true,
        "uptime": 12
    });

    // WHEN: Decoding
    let payload = Payload::from_data(MessageKind::SystemStatus, with_extra);

    // THEN: Extras are ignored and the flag stays false
    assert_eq!(
        payload.expect("extra fields should be ignored"),
        Payload::SystemStatus(SystemStatus {
            python_layer_connected: false,
            voicevox_connected: true,
            langflow_connected: true,
        })
    );
}

/// **VALUE**: Verifies the status frame a Python core sends on connect decodes.
///
/// **WHY THIS MATTERS**: That core reports `*_active` service flags and resource
/// figures but never `pythonLayerConnected`. Rejecting the frame would drop every
/// greeting and leave service health unknown for the whole session.
///
/// **BUG THIS CATCHES**: Would catch the core flag becoming required again, or the
/// `voicevox_active`/`langflow_active` aliases going missing.
#[test]
fn given_python_core_status_frame_when_decoding_then_core_is_up_and_services_mapped() {
    // GIVEN: The data object of a Python core's greeting
    let data = json!({
        "cpu_usage": 0.0,
        "memory_usage": 0.0,
        "whisper_active": false,
        "voicevox_active": true,
        "langflow_active": false,
        "wake_word_sensitivity": 0.8,
        "last_wake_word": null,
        "session_count": 1,
        "uptime": 0,
        "timestamp": "2025-01-01T00:00:00"
    });

    // WHEN: Decoding
    let payload = Payload::from_data(MessageKind::SystemStatus, data);

    // THEN: The core counts as up and the service flags carry over
    assert_eq!(
        payload.expect("python core status should decode"),
        Payload::SystemStatus(SystemStatus {
            python_layer_connected: true,
            voicevox_connected: true,
            langflow_connected: false,
        })
    );
}

/// **VALUE**: Verifies `warn` is accepted as an alias for the warning log level.
#[test]
fn given_warn_level_when_decoding_log_entry_then_maps_to_warning() {
    let payload = Payload::from_data(
        MessageKind::LogEntry,
        json!({"level": "warn", "message": "disk almost full"}),
    )
    .expect("valid log entry");

    match payload {
        Payload::LogEntry(entry) => assert_eq!(entry.level, LogLevel::Warning),
        other => panic!("Expected log entry, got {other:?}"),
    }
}

/// **VALUE**: Verifies settings patches are sent as a flat object.
///
/// **BUG THIS CATCHES**: Would catch if `flatten` were dropped and the core received
/// `{"settings": {...}}` instead of the keys it reads.
#[test]
fn given_settings_update_when_encoding_then_keys_are_flattened() {
    // GIVEN: A settings patch
    let mut settings = serde_json::Map::new();
    settings.insert(String::from("volume"), json!(0.4));
    let payload = Payload::SettingsUpdate(crate::SettingsUpdate { settings });

    // WHEN: Encoding into data
    let data = payload.to_data().expect("encodable");

    // THEN: Keys sit at the top of the data object
    assert_eq!(data, json!({"volume": 0.4}));
}
