use crate::face::machine::FaceMachine;
use crate::face::transition::FaceEvent;

use models::{Expression, ModelError, ParameterOverrides, Phase};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

/// **VALUE**: Verifies parameters always equal the row of the resulting phase.
///
/// **WHY THIS MATTERS**: Parameters are derived from the phase alone; the expression must
/// never leak into them.
///
/// **BUG THIS CATCHES**: Would catch parameters left over from the previous phase.
#[test]
fn given_events_without_overrides_when_applied_then_parameters_match_phase_row() {
    let mut machine = FaceMachine::new(ParameterOverrides::default());

    for event in [
        FaceEvent::WakeWordDetected,
        FaceEvent::UserSpeechEnded,
        FaceEvent::AgentResponded,
        FaceEvent::CoreDisconnected,
        FaceEvent::Sleep,
        FaceEvent::Reset,
    ] {
        machine.apply(event, at(1));
        let snapshot = machine.snapshot();
        assert_eq!(snapshot.parameters, snapshot.phase.parameters(), "after {event:?}");
    }
}

/// **VALUE**: Verifies revision and state duration bookkeeping.
///
/// **BUG THIS CATCHES**: Would catch a no-op event bumping the revision (readers would
/// re-render for nothing) or `since` not moving on a change.
#[test]
fn given_changes_and_noops_when_applied_then_revision_and_since_track_changes_only() {
    // GIVEN: A fresh machine
    let mut machine = FaceMachine::new(ParameterOverrides::default());
    assert_eq!(machine.snapshot().revision, 0);

    // WHEN: A real change at t=100
    let change = machine
        .apply(FaceEvent::WakeWordDetected, at(100))
        .expect("idle -> listening is a change");

    // THEN: Revision 1, previous state recorded
    assert_eq!(change.previous_phase, Phase::Idle);
    assert_eq!(change.previous_expression, Expression::Neutral);
    assert_eq!(change.snapshot.revision, 1);
    assert_eq!(change.snapshot.since, at(100));

    // WHEN: Speech starting while already listening and excited
    let noop = machine.apply(FaceEvent::UserSpeechStarted, at(105));

    // THEN: Nothing published, duration keeps counting from t=100
    assert!(noop.is_none());
    assert_eq!(machine.snapshot().revision, 1);
    assert_eq!(
        machine.snapshot().state_duration(at(107)),
        Duration::from_secs(7)
    );
}

/// **VALUE**: Verifies overrides persist across transitions until cleared.
///
/// **BUG THIS CATCHES**: Would catch overrides being dropped on the next phase change.
#[test]
fn given_overrides_when_phase_changes_then_overrides_still_applied() {
    // GIVEN: A glow override
    let mut machine = FaceMachine::new(ParameterOverrides::default());
    let overrides = ParameterOverrides {
        glow_intensity: Some(0.2),
        ..Default::default()
    };
    machine.set_overrides(overrides).expect("finite override");

    // WHEN: Moving to speaking
    machine.apply(FaceEvent::AgentResponded, at(1));

    // THEN: Speaking row with glow overridden
    let snapshot = machine.snapshot();
    assert_eq!(snapshot.parameters.glow_intensity, 0.2);
    assert_eq!(snapshot.parameters.mouth_movement, 0.8);

    // WHEN: Clearing
    machine.clear_overrides();

    // THEN: Back to the plain row
    assert_eq!(machine.snapshot().parameters, Phase::Speaking.parameters());
}

/// **VALUE**: Verifies an invalid override leaves the state untouched.
#[test]
fn given_infinite_override_when_set_then_rejected_and_state_unchanged() {
    let mut machine = FaceMachine::new(ParameterOverrides::default());
    let before = machine.snapshot();

    let result = machine.set_overrides(ParameterOverrides {
        pulse_speed: Some(f32::INFINITY),
        ..Default::default()
    });

    assert!(matches!(result, Err(ModelError::Validation { .. })));
    assert_eq!(machine.snapshot(), before);
}
