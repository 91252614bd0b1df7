use crate::config::{AppConfig, FaceSize};
use crate::error::config::ConfigError;

use serde_json::json;

/// **VALUE**: Verifies settings round-trip through settings.json.
///
/// **BUG THIS CATCHES**: Would catch a save that writes only the temp file, or a field
/// lost between save and load.
#[test]
fn given_modified_settings_when_saved_and_loaded_then_values_preserved() {
    // GIVEN: Non-default settings
    let dir = tempfile::tempdir().expect("tempdir");
    let mut settings = AppConfig::default();
    settings.voice.speech_speed = 1.25;
    settings.display.face_size = FaceSize::Large;
    settings.display.overrides.head_tilt = Some(4.0);

    // WHEN: Saving and loading
    settings.save(dir.path()).expect("save");
    let loaded = AppConfig::load(dir.path()).expect("load");

    // THEN: Identical, and no temp file left behind
    assert_eq!(loaded, settings);
    assert!(!dir.path().join("settings.json.tmp").exists());
}

/// **VALUE**: Verifies a missing file yields defaults and a partial file fills gaps.
#[test]
fn given_partial_settings_file_when_loaded_then_missing_fields_defaulted() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert_eq!(AppConfig::load(dir.path()).expect("defaults"), AppConfig::default());

    std::fs::write(
        dir.path().join("settings.json"),
        r#"{"voice": {"volume": 0.3}}"#,
    )
    .expect("write");

    let loaded = AppConfig::load(dir.path()).expect("load");
    assert_eq!(loaded.voice.volume, 0.3);
    assert_eq!(loaded.voice.speech_speed, 1.0);
    assert!(loaded.behavior.echo_face_state);
}

/// **VALUE**: Verifies patches deep-merge into nested sections.
///
/// **WHY THIS MATTERS**: The presentation layer sends one field at a time; a shallow merge
/// would reset the rest of the section to defaults.
#[test]
fn given_nested_patch_when_applied_then_sibling_fields_untouched() {
    // GIVEN: Settings with a custom volume
    let mut settings = AppConfig::default();
    settings.voice.volume = 0.4;

    // WHEN: Patching only the speed
    let updated = settings
        .apply_patch(&json!({"voice": {"speech_speed": 1.5}}))
        .expect("valid patch");

    // THEN: Speed changed, volume kept, source settings untouched
    assert_eq!(updated.voice.speech_speed, 1.5);
    assert_eq!(updated.voice.volume, 0.4);
    assert_eq!(settings.voice.speech_speed, 1.0);
}

/// **VALUE**: Verifies invalid patches are rejected as a whole.
///
/// **BUG THIS CATCHES**: Would catch out-of-range values, unknown enum options, wrong types
/// or nulls being accepted.
#[test]
fn given_invalid_patches_when_applied_then_each_is_rejected() {
    let settings = AppConfig::default();
    let patches = [
        json!({"voice": {"speech_speed": 3.0}}),
        json!({"display": {"face_size": "huge"}}),
        json!({"display": {"always_on_top": "yes"}}),
        json!({"voice": {"voicevox_speaker_id": null}}),
        json!({"behavior": {"wake_word_sensitivity": 0.2}}),
        json!("not an object"),
    ];

    for patch in patches {
        assert!(
            matches!(
                settings.apply_patch(&patch),
                Err(ConfigError::ValidationError { .. })
            ),
            "patch {patch} should be rejected"
        );
    }
}
