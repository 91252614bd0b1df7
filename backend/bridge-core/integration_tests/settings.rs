use bridge_core::config::{AppConfig, SETTINGS_FILE_NAME};
use bridge_core::error::config::ConfigError;
use bridge_core::settings::SettingsStore;

use serde_json::json;

/// **VALUE**: Verifies an update is applied in memory and persisted.
///
/// **WHY THIS MATTERS**: Settings changed in the UI must survive a restart.
///
/// **BUG THIS CATCHES**: Would catch if the actor replies before saving, saves the old
/// settings, or forgets to update the in-memory copy.
#[tokio::test]
async fn given_valid_patch_when_updated_then_memory_and_file_reflect_change() {
    // GIVEN: A store over an empty directory
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SettingsStore::load(dir.path().to_path_buf()).expect("load defaults");

    // WHEN: Updating the volume
    let updated = store
        .update(json!({"voice": {"volume": 0.5}}))
        .await
        .expect("valid patch");

    // THEN: Returned, readable and on disk
    assert_eq!(updated.voice.volume, 0.5);
    assert_eq!(store.get().await.voice.volume, 0.5);
    assert!(dir.path().join(SETTINGS_FILE_NAME).exists());
    let reloaded = AppConfig::load(dir.path()).expect("reload");
    assert_eq!(reloaded, updated);
}

/// **VALUE**: Verifies a rejected patch changes nothing.
///
/// **BUG THIS CATCHES**: Would catch partially applied patches, where valid keys from an
/// invalid patch leak into memory or disk.
#[tokio::test]
async fn given_invalid_patch_when_updated_then_rejected_and_nothing_changes() {
    // GIVEN: A store with saved settings
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SettingsStore::new(dir.path().to_path_buf(), AppConfig::default());
    store
        .update(json!({"display": {"always_on_top": true}}))
        .await
        .expect("valid patch");
    let before = std::fs::read_to_string(dir.path().join(SETTINGS_FILE_NAME)).expect("read");

    // WHEN: A patch mixing a valid key with an out-of-range one
    let result = store
        .update(json!({"voice": {"volume": 0.1, "speech_speed": 9.0}}))
        .await;

    // THEN: Rejected, memory and file untouched
    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    let current = store.get().await;
    assert_eq!(current.voice.volume, 0.8);
    assert!(current.display.always_on_top);
    let after = std::fs::read_to_string(dir.path().join(SETTINGS_FILE_NAME)).expect("read");
    assert_eq!(before, after);
}

/// **VALUE**: Verifies concurrent updates from clones are serialized without losing any.
#[tokio::test]
async fn given_concurrent_updates_when_applied_then_all_land() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SettingsStore::new(dir.path().to_path_buf(), AppConfig::default());
    let other = store.clone();

    let (a, b) = tokio::join!(
        store.update(json!({"voice": {"volume": 0.3}})),
        other.update(json!({"voice": {"speech_speed": 1.5}})),
    );
    a.expect("first patch");
    b.expect("second patch");

    let current = store.get().await;
    assert_eq!(current.voice.volume, 0.3);
    assert_eq!(current.voice.speech_speed, 1.5);
}
