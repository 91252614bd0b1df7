use crate::face::transition::{FaceEvent, event_for_connection, event_for_envelope, transition};

use models::{
    ConnectionStatus, Envelope, ErrorReport, Expression, Payload, Phase, SystemStatus, TtsEnd,
    UserSpeechEnd, WakeWordDetected,
};

fn run(events: &[FaceEvent]) -> (Phase, Expression) {
    events
        .iter()
        .fold((Phase::Idle, Expression::Neutral), |state, event| {
            transition(state, *event)
        })
}

/// **VALUE**: Verifies the canonical conversation turn ends idle and neutral.
///
/// **WHY THIS MATTERS**: This is the sequence every spoken exchange produces. If it
/// ends anywhere else the face gets stuck after the first answer.
///
/// **BUG THIS CATCHES**: Would catch any wrong row among the five events involved.
#[test]
fn given_full_conversation_turn_when_applied_then_ends_idle_neutral() {
    // GIVEN/WHEN: wake word, speech end, agent response, synthesis start and end
    let state = run(&[
        FaceEvent::WakeWordDetected,
        FaceEvent::UserSpeechEnded,
        FaceEvent::AgentResponded,
        FaceEvent::SynthesisStarted,
        FaceEvent::SynthesisEnded,
    ]);

    // THEN: Idle and neutral
    assert_eq!(state, (Phase::Idle, Expression::Neutral));
    assert_eq!(state.0.parameters(), Phase::Idle.parameters());
}

/// **VALUE**: Verifies every row of the event table, including "unchanged" expressions.
///
/// **BUG THIS CATCHES**: Would catch an event that overwrites the expression when it
/// should keep it, or the other way round.
#[test]
fn given_each_event_when_applied_then_matches_table_row() {
    let from = (Phase::Thinking, Expression::Confused);
    let cases = [
        (FaceEvent::WakeWordDetected, Phase::Listening, Expression::Excited),
        (FaceEvent::UserSpeechStarted, Phase::Listening, Expression::Confused),
        (FaceEvent::UserSpeechEnded, Phase::Thinking, Expression::Neutral),
        (FaceEvent::AgentResponded, Phase::Speaking, Expression::Happy),
        (FaceEvent::SynthesisStarted, Phase::Speaking, Expression::Confused),
        (FaceEvent::SynthesisEnded, Phase::Idle, Expression::Neutral),
        (FaceEvent::CoreDisconnected, Phase::Error, Expression::Sad),
        (FaceEvent::CoreUnhealthy, Phase::Error, Expression::Sad),
        (FaceEvent::CoreError, Phase::Error, Expression::Sad),
        (FaceEvent::Reset, Phase::Idle, Expression::Neutral),
        (FaceEvent::Sleep, Phase::Sleeping, Expression::Confused),
    ];

    for (event, phase, expression) in cases {
        assert_eq!(transition(from, event), (phase, expression), "event {event:?}");
    }
}

/// **VALUE**: Verifies which envelopes drive the face.
///
/// **BUG THIS CATCHES**: Would catch a healthy `system_status` putting the face into error,
/// or an `error` envelope being ignored.
#[test]
fn given_envelopes_when_mapped_then_only_conversation_kinds_produce_events() {
    let wake = Envelope::core(Payload::WakeWordDetected(WakeWordDetected {
        confidence: 0.93,
        keyword: String::from("Yes-Man"),
        audio_duration: None,
    }));
    let speech_end = Envelope::core(Payload::UserSpeechEnd(UserSpeechEnd::default()));
    let tts_end = Envelope::core(Payload::TtsEnd(TtsEnd {}));
    let healthy = Envelope::core(Payload::SystemStatus(SystemStatus {
        python_layer_connected: true,
        voicevox_connected: false,
        langflow_connected: true,
    }));
    let unhealthy = Envelope::core(Payload::SystemStatus(SystemStatus {
        python_layer_connected: false,
        voicevox_connected: true,
        langflow_connected: true,
    }));
    let error = Envelope::core(Payload::Error(ErrorReport {
        message: String::from("agent crashed"),
    }));
    let heartbeat = Envelope::core(Payload::heartbeat());

    assert_eq!(event_for_envelope(&wake), Some(FaceEvent::WakeWordDetected));
    assert_eq!(event_for_envelope(&speech_end), Some(FaceEvent::UserSpeechEnded));
    assert_eq!(event_for_envelope(&tts_end), Some(FaceEvent::SynthesisEnded));
    assert_eq!(event_for_envelope(&healthy), None);
    assert_eq!(event_for_envelope(&unhealthy), Some(FaceEvent::CoreUnhealthy));
    assert_eq!(event_for_envelope(&error), Some(FaceEvent::CoreError));
    assert_eq!(event_for_envelope(&heartbeat), None);
}

/// **VALUE**: Verifies which connection changes mean "core disconnected".
///
/// **WHY THIS MATTERS**: Retry churn while already disconnected must not keep re-entering
/// the error state, but losing an established link or giving up must.
#[test]
fn given_status_changes_when_mapped_then_only_link_loss_and_failure_produce_events() {
    use ConnectionStatus::{Connected, Connecting, Disconnected, Failed};

    assert_eq!(event_for_connection(Connected, Disconnected), Some(FaceEvent::CoreDisconnected));
    assert_eq!(event_for_connection(Connected, Connecting), Some(FaceEvent::CoreDisconnected));
    assert_eq!(event_for_connection(Disconnected, Failed), Some(FaceEvent::CoreDisconnected));
    assert_eq!(event_for_connection(Disconnected, Connecting), None);
    assert_eq!(event_for_connection(Connecting, Disconnected), None);
    assert_eq!(event_for_connection(Connecting, Connected), None);
}
