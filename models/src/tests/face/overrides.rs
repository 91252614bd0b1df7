use crate::{ModelError, ParameterOverrides, Phase};

/// **VALUE**: Verifies overrides replace only the fields they set.
///
/// **BUG THIS CATCHES**: Would catch if `apply` copied a `None` as zero or swapped fields.
#[test]
fn given_partial_overrides_when_applied_then_other_fields_keep_baseline() {
    // GIVEN: A glow override on the speaking row
    let overrides = ParameterOverrides {
        glow_intensity: Some(0.1),
        head_tilt: Some(-5.0),
        ..Default::default()
    };

    // WHEN: Applying
    let params = overrides.apply(Phase::Speaking.parameters());

    // THEN: Overridden fields change, others stay
    assert_eq!(params.glow_intensity, 0.1);
    assert_eq!(params.head_tilt, -5.0);
    assert_eq!(params.mouth_movement, 0.8);
    assert_eq!(params.pulse_speed, 2.0);
}

/// **VALUE**: Verifies non-finite override values are rejected.
///
/// **WHY THIS MATTERS**: A NaN reaching the renderer poisons every animation frame.
#[test]
fn given_nan_override_when_validating_then_returns_validation_error() {
    let overrides = ParameterOverrides {
        blink_rate: Some(f32::NAN),
        ..Default::default()
    };

    match overrides.validate() {
        Err(ModelError::Validation { message, .. }) => assert!(message.contains("blinkRate")),
        Ok(()) => panic!("NaN override should be rejected"),
    }
}

/// **VALUE**: Verifies the default override set is empty and valid.
#[test]
fn given_default_overrides_when_checked_then_empty_and_valid() {
    let overrides = ParameterOverrides::default();
    assert!(overrides.is_empty());
    assert!(overrides.validate().is_ok());
    assert_eq!(overrides.apply(Phase::Idle.parameters()), Phase::Idle.parameters());
}
