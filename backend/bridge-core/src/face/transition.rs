use models::{ConnectionStatus, Envelope, Expression, Payload, Phase};

/// Discrete conversation events that drive the face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceEvent {
    WakeWordDetected,
    UserSpeechStarted,
    UserSpeechEnded,
    AgentResponded,
    SynthesisStarted,
    SynthesisEnded,
    CoreDisconnected,
    CoreUnhealthy,
    /// Application-level `error` envelope. The transport is unaffected.
    CoreError,
    Reset,
    Sleep,
}

/// Apply one event to a `(phase, expression)` pair.
///
/// Total: every event yields a state. Events that keep the expression carry the
/// current one through.
pub fn transition(current: (Phase, Expression), event: FaceEvent) -> (Phase, Expression) {
    let (_, expression) = current;
    match event {
        FaceEvent::WakeWordDetected => (Phase::Listening, Expression::Excited),
        FaceEvent::UserSpeechStarted => (Phase::Listening, expression),
        FaceEvent::UserSpeechEnded => (Phase::Thinking, Expression::Neutral),
        FaceEvent::AgentResponded => (Phase::Speaking, Expression::Happy),
        FaceEvent::SynthesisStarted => (Phase::Speaking, expression),
        FaceEvent::SynthesisEnded => (Phase::Idle, Expression::Neutral),
        FaceEvent::CoreDisconnected | FaceEvent::CoreUnhealthy | FaceEvent::CoreError => {
            (Phase::Error, Expression::Sad)
        }
        FaceEvent::Reset => (Phase::Idle, Expression::Neutral),
        FaceEvent::Sleep => (Phase::Sleeping, expression),
    }
}

/// Event carried by an inbound envelope, if any.
pub fn event_for_envelope(envelope: &Envelope) -> Option<FaceEvent> {
    match &envelope.payload {
        Payload::WakeWordDetected(_) => Some(FaceEvent::WakeWordDetected),
        Payload::UserSpeechStart(_) => Some(FaceEvent::UserSpeechStarted),
        Payload::UserSpeechEnd(_) => Some(FaceEvent::UserSpeechEnded),
        Payload::AgentResponse(_) => Some(FaceEvent::AgentResponded),
        Payload::TtsStart(_) => Some(FaceEvent::SynthesisStarted),
        Payload::TtsEnd(_) => Some(FaceEvent::SynthesisEnded),
        Payload::SystemStatus(status) if !status.python_layer_connected => {
            Some(FaceEvent::CoreUnhealthy)
        }
        Payload::Error(_) => Some(FaceEvent::CoreError),
        _ => None,
    }
}

/// Event implied by a connection status change, if any.
///
/// Leaving `connected` for any other status, or entering `failed`, means the
/// core is gone.
pub fn event_for_connection(
    previous: ConnectionStatus,
    current: ConnectionStatus,
) -> Option<FaceEvent> {
    let left_connected =
        previous == ConnectionStatus::Connected && current != ConnectionStatus::Connected;
    let entered_failed =
        previous != ConnectionStatus::Failed && current == ConnectionStatus::Failed;

    (left_connected || entered_failed).then_some(FaceEvent::CoreDisconnected)
}
