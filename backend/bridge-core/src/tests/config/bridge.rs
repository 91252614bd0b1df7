use crate::config::BridgeConfig;
use crate::config::bridge::{ENV_CORE_URL, ENV_HEARTBEAT_INTERVAL_MS, ENV_RECONNECT_MAX_ATTEMPTS};
use crate::error::config::ConfigError;
use crate::CORE_URL;

use std::collections::HashMap;
use std::time::Duration;

/// **VALUE**: Verifies defaults match the documented transport constants.
///
/// **BUG THIS CATCHES**: Would catch a changed default port, heartbeat or queue size.
#[test]
fn given_default_config_when_inspected_then_matches_documented_constants() {
    let config = BridgeConfig::default();

    assert_eq!(config.core.url, CORE_URL);
    assert_eq!(CORE_URL, "ws://127.0.0.1:8765");
    assert_eq!(config.heartbeat_interval(), Duration::from_secs(10));
    assert_eq!(config.liveness_timeout(), Duration::from_secs(30));
    assert_eq!(config.check_interval(), Duration::from_secs(1));
    assert_eq!(config.reconnect.base_delay_ms, 3000);
    assert_eq!(config.reconnect.multiplier, 1.5);
    assert_eq!(config.queue.capacity, 2048);
    assert!(config.validate().is_ok());
}

/// **VALUE**: Verifies the config/ subdirectory wins over the flat location and that
/// missing sections fall back to defaults.
///
/// **BUG THIS CATCHES**: Would catch the search order being flipped or a partial file
/// failing to parse.
#[test]
fn given_bridge_toml_in_both_locations_when_loading_then_config_subdir_wins() {
    // GIVEN: Two bridge.toml files
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("config")).expect("mkdir");
    std::fs::write(
        dir.path().join("config").join("bridge.toml"),
        "[core]\nurl = \"ws://127.0.0.1:9001\"\n\n[reconnect]\nmax_attempts = 4\n",
    )
    .expect("write");
    std::fs::write(
        dir.path().join("bridge.toml"),
        "[core]\nurl = \"ws://127.0.0.1:9002\"\n",
    )
    .expect("write");

    // WHEN: Loading
    let config = BridgeConfig::load(dir.path()).expect("load never fails");

    // THEN: config/bridge.toml was used, other fields defaulted
    assert_eq!(config.core.url, "ws://127.0.0.1:9001");
    assert_eq!(config.reconnect.max_attempts, 4);
    assert_eq!(config.reconnect.base_delay_ms, 3000);
}

/// **VALUE**: Verifies an invalid file is skipped in favour of the next location.
#[test]
fn given_invalid_first_file_when_loading_then_falls_through_to_next_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("config")).expect("mkdir");
    std::fs::write(
        dir.path().join("config").join("bridge.toml"),
        "[core]\nurl = \"http://not-a-websocket\"\n",
    )
    .expect("write");
    std::fs::write(
        dir.path().join("bridge.toml"),
        "[liveness]\nheartbeat_interval_ms = 2500\n",
    )
    .expect("write");

    let config = BridgeConfig::load(dir.path()).expect("load never fails");

    assert_eq!(config.core.url, CORE_URL);
    assert_eq!(config.heartbeat_interval(), Duration::from_millis(2500));
}

/// **VALUE**: Verifies environment overrides are applied and validated.
///
/// **WHY THIS MATTERS**: Deployments point the face at a different core without editing
/// files.
///
/// **BUG THIS CATCHES**: Would catch a non-numeric override silently becoming zero.
#[test]
fn given_env_overrides_when_applied_then_fields_replaced_or_rejected() {
    // GIVEN: Override values
    let vars: HashMap<&str, &str> = HashMap::from([
        (ENV_CORE_URL, "ws://127.0.0.1:7000"),
        (ENV_HEARTBEAT_INTERVAL_MS, "500"),
        (ENV_RECONNECT_MAX_ATTEMPTS, "3"),
    ]);
    let mut config = BridgeConfig::default();

    // WHEN: Applying
    config
        .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
        .expect("valid overrides");

    // THEN: Fields replaced
    assert_eq!(config.core.url, "ws://127.0.0.1:7000");
    assert_eq!(config.heartbeat_interval(), Duration::from_millis(500));
    assert_eq!(config.reconnect.max_attempts, 3);

    // WHEN: A non-numeric override
    let result = BridgeConfig::default().apply_overrides(|key| {
        (key == ENV_HEARTBEAT_INTERVAL_MS).then(|| String::from("soon"))
    });

    // THEN: Rejected
    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}

/// **VALUE**: Verifies validation rejects values that would break the channel.
#[test]
fn given_invalid_values_when_validating_then_each_is_rejected() {
    let mut bad_scheme = BridgeConfig::default();
    bad_scheme.core.url = String::from("http://127.0.0.1:8765");

    let mut zero_heartbeat = BridgeConfig::default();
    zero_heartbeat.liveness.heartbeat_interval_ms = 0;

    let mut shrinking = BridgeConfig::default();
    shrinking.reconnect.multiplier = 0.5;

    let mut zero_queue = BridgeConfig::default();
    zero_queue.queue.capacity = 0;

    for config in [bad_scheme, zero_heartbeat, shrinking, zero_queue] {
        assert!(
            matches!(config.validate(), Err(ConfigError::ValidationError { .. })),
            "{config:?} should be invalid"
        );
    }
}
