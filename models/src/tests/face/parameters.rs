use crate::{FaceParameters, Phase};

fn row(phase: Phase) -> [f32; 5] {
    let p: FaceParameters = phase.parameters();
    [p.blink_rate, p.eye_openness, p.mouth_movement, p.glow_intensity, p.pulse_speed]
}

/// **VALUE**: Verifies every phase maps to its documented parameter row.
///
/// **WHY THIS MATTERS**: The renderer trusts these numbers blindly. A swapped row would
/// make the face look asleep while listening.
///
/// **BUG THIS CATCHES**: Would catch any edited constant or swapped match arm.
#[test]
fn given_each_phase_when_deriving_parameters_then_matches_table() {
    assert_eq!(row(Phase::Idle), [0.3, 1.0, 0.0, 0.8, 1.0]);
    assert_eq!(row(Phase::Listening), [0.3, 1.2, 0.0, 1.0, 1.5]);
    assert_eq!(row(Phase::Thinking), [0.5, 1.0, 0.0, 0.6, 0.8]);
    assert_eq!(row(Phase::Speaking), [0.3, 1.0, 0.8, 1.0, 2.0]);
    assert_eq!(row(Phase::Error), [0.8, 1.0, 0.0, 1.0, 3.0]);
    assert_eq!(row(Phase::Sleeping), [0.1, 0.2, 0.0, 0.3, 0.3]);
}

/// **VALUE**: Verifies head tilt has a zero baseline everywhere.
#[test]
fn given_any_phase_when_deriving_parameters_then_head_tilt_is_zero() {
    for phase in Phase::ALL {
        assert_eq!(phase.parameters().head_tilt, 0.0, "phase {phase}");
    }
}

/// **VALUE**: Verifies phases serialize with their lowercase wire names.
#[test]
fn given_phase_when_serializing_then_uses_lowercase_name() {
    for phase in Phase::ALL {
        let json = serde_json::to_string(&phase).expect("serializable");
        assert_eq!(json, format!("\"{}\"", phase.as_str()));
    }
}
