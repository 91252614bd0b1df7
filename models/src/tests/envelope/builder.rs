use crate::{EnvelopeBuilder, ModelError, Origin, Payload, TtsEnd};

use std::time::{Duration, SystemTime};

/// **VALUE**: Verifies that an envelope without an origin is rejected.
///
/// **WHY THIS MATTERS**: The codec writes `source` on every frame. An envelope with no
/// producer would be ambiguous for the core's routing.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Required origin validation is removed
/// - Builder silently defaults the origin
#[test]
fn given_missing_origin_when_building_envelope_then_returns_validation_error() {
    // GIVEN: Builder with a payload but no origin
    let builder = EnvelopeBuilder::default().with_payload(Payload::heartbeat());

    // WHEN: Attempting to build
    let result = builder.build();

    // THEN: Should return validation error
    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert_eq!(message, "Origin is required");
        }
        Ok(envelope) => panic!("Expected validation error, got {envelope:?}"),
    }
}

/// **VALUE**: Verifies that an envelope without a payload is rejected.
///
/// **BUG THIS CATCHES**: Would catch if the builder produced envelopes with no kind.
#[test]
fn given_missing_payload_when_building_envelope_then_returns_validation_error() {
    // GIVEN: Builder with an origin but no payload
    let builder = EnvelopeBuilder::default().with_origin(Origin::Client);

    // WHEN: Attempting to build
    let result = builder.build();

    // THEN: Should return validation error
    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert_eq!(message, "Payload is required");
        }
        Ok(envelope) => panic!("Expected validation error, got {envelope:?}"),
    }
}

/// **VALUE**: Verifies that a blank id is rejected.
///
/// **WHY THIS MATTERS**: Every sent envelope must carry a non-empty id so the core can
/// correlate diagnostics and discard duplicates.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The empty-id check is removed
/// - Whitespace-only ids slip through
#[test]
fn given_blank_id_when_building_envelope_then_returns_validation_error() {
    // GIVEN: Builder with a whitespace id
    let builder = EnvelopeBuilder::default()
        .with_id("   ")
        .with_origin(Origin::Core)
        .with_payload(Payload::TtsEnd(TtsEnd {}));

    // WHEN: Attempting to build
    let result = builder.build();

    // THEN: Should return validation error
    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert_eq!(message, "Envelope id cannot be empty");
        }
        Ok(envelope) => panic!("Expected validation error, got {envelope:?}"),
    }
}

/// **VALUE**: Verifies defaults for id and timestamp and that explicit values are kept.
///
/// **BUG THIS CATCHES**: Would catch if the builder dropped a caller-supplied id or
/// timestamp, or produced an empty default id.
#[test]
fn given_builder_when_id_and_timestamp_omitted_then_generates_them() {
    // GIVEN: A fixed timestamp for the second envelope
    let fixed = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

    // WHEN: Building one envelope with defaults and one with explicit values
    let generated = EnvelopeBuilder::default()
        .with_origin(Origin::Client)
        .with_payload(Payload::heartbeat())
        .build()
        .expect("defaults should build");
    let explicit = EnvelopeBuilder::default()
        .with_id("env-1")
        .with_timestamp(fixed)
        .with_origin(Origin::Client)
        .with_payload(Payload::heartbeat())
        .build()
        .expect("explicit values should build");

    // THEN: Defaults are populated and explicit values are preserved
    assert!(!generated.id.is_empty());
    assert_eq!(explicit.id, "env-1");
    assert_eq!(explicit.timestamp, fixed);
    assert_eq!(explicit.origin, Origin::Client);
}
