use bridge_core::config::{AppConfig, BridgeConfig};
use bridge_core::peer::{CoreEndpointHandle, EndpointConfig, start_core_endpoint};
use bridge_core::settings::SettingsStore;

use models::{ConnectionStatus, LogLevel, Payload, Phase, SystemStatus, WakeWordDetected};

use yesman::host::FaceHost;

use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Integration tests for the host against an in-process core endpoint
// ============================================================================

async fn start_endpoint() -> CoreEndpointHandle {
    start_core_endpoint(EndpointConfig::default())
        .await
        .expect("Failed to start core endpoint")
}

async fn host_for(endpoint: &CoreEndpointHandle) -> (FaceHost, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = BridgeConfig::for_url(endpoint.url());
    config.reconnect.base_delay_ms = 50;
    config.reconnect.max_delay_ms = 500;
    let settings = SettingsStore::new(dir.path().to_path_buf(), AppConfig::default());
    (FaceHost::new(config, settings).await, dir)
}

/// **VALUE**: Verifies start/get_status/stop drive the channel and report health.
///
/// **WHY THIS MATTERS**: This is the whole embedder surface. A status panel built on
/// `get_status()` must reflect the link and the services the core reported.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - `start()` does not connect or `stop()` does not disconnect
/// - The greeting's `system_status` is not recorded as service health
#[tokio::test]
async fn given_host_when_started_and_stopped_then_status_follows() {
    // GIVEN: A core whose voice engine is down
    let endpoint = start_endpoint().await;
    endpoint.set_greeting(SystemStatus {
        python_layer_connected: true,
        voicevox_connected: false,
        langflow_connected: true,
    });
    let (host, _dir) = host_for(&endpoint).await;
    assert_eq!(host.get_status().connection.status, ConnectionStatus::Disconnected);
    assert!(host.get_status().services.updated_at.is_none());

    // WHEN: Starting
    host.start();
    assert!(host.channel().wait_for_status(ConnectionStatus::Connected, WAIT).await);

    // THEN: Health arrives with the greeting
    let deadline = tokio::time::Instant::now() + WAIT;
    while host.get_status().services.updated_at.is_none() {
        assert!(tokio::time::Instant::now() < deadline, "no system_status recorded");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let status = host.get_status();
    assert!(status.services.python_layer);
    assert!(!status.services.voicevox);
    assert!(status.services.core_healthy());
    assert_eq!(status.face.phase, Phase::Idle);

    // WHEN: Stopping
    host.stop();

    // THEN: Disconnected, and the face shows the lost core
    assert!(host.channel().wait_for_status(ConnectionStatus::Disconnected, WAIT).await);
    assert!(host.face().wait_for_phase(Phase::Error, WAIT).await);

    host.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies the outbound helpers produce the right envelopes, in order.
#[tokio::test]
async fn given_started_host_when_sending_then_core_receives_typed_envelopes() {
    // GIVEN: A connected host
    let endpoint = start_endpoint().await;
    let (host, _dir) = host_for(&endpoint).await;
    host.start();
    assert!(host.channel().wait_for_status(ConnectionStatus::Connected, WAIT).await);

    // WHEN: Sending input, a command and a log line
    let input_id = host.send_user_input("what time is it", Some(String::from("s-1")));
    host.send_system_command("mute", Some(json!({"seconds": 30})));
    host.forward_log(LogLevel::Warning, "frame drop", None);

    // THEN: All three arrive in order with the right payloads
    let received = endpoint.wait_for_received(3, WAIT).await;
    assert_eq!(received.len(), 3);
    assert_eq!(received[0].id, input_id);
    match &received[0].payload {
        Payload::UserInput(input) => {
            assert_eq!(input.text, "what time is it");
            assert_eq!(input.session_id.as_deref(), Some("s-1"));
        }
        other => panic!("Expected user_input, got {other:?}"),
    }
    assert!(matches!(&received[1].payload, Payload::SystemCommand(c) if c.command == "mute"));
    assert!(matches!(&received[2].payload, Payload::LogEntry(l) if l.level == LogLevel::Warning));

    host.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies a settings update persists, applies overrides and notifies the core.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Overrides are saved but never reach the face
/// - The core is told about a patch that was rejected
#[tokio::test]
async fn given_settings_patch_when_updated_then_persisted_applied_and_sent() {
    // GIVEN: A connected host
    let endpoint = start_endpoint().await;
    let (host, dir) = host_for(&endpoint).await;
    host.start();
    assert!(host.channel().wait_for_status(ConnectionStatus::Connected, WAIT).await);

    // WHEN: Updating an override
    let updated = host
        .update_settings(json!({"display": {"overrides": {"glowIntensity": 0.4}}}))
        .await
        .expect("valid patch");

    // THEN: Persisted, applied and announced
    assert_eq!(updated.display.overrides.glow_intensity, Some(0.4));
    assert!(dir.path().join("settings.json").exists());
    assert_eq!(host.face().snapshot().parameters.glow_intensity, 0.4);
    let received = endpoint.wait_for_received(1, WAIT).await;
    assert!(matches!(&received[0].payload, Payload::SettingsUpdate(u) if u.settings.contains_key("display")));

    // WHEN: A rejected patch
    let rejected = host.update_settings(json!({"voice": {"volume": 4.0}})).await;

    // THEN: Error, and nothing more sent
    assert!(rejected.is_err());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(endpoint.received().len(), 1);

    host.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies turning echo off stops face_state_change traffic.
#[tokio::test]
async fn given_echo_disabled_when_face_changes_then_nothing_echoed() {
    // GIVEN: A connected host with echo on by default
    let endpoint = start_endpoint().await;
    let (host, _dir) = host_for(&endpoint).await;
    host.start();
    assert!(host.channel().wait_for_status(ConnectionStatus::Connected, WAIT).await);
    assert!(endpoint.wait_for_clients(1, WAIT).await);

    // WHEN: Disabling echo, then the core reports a wake word
    host.update_settings(json!({"behavior": {"echo_face_state": false}}))
        .await
        .expect("valid patch");
    endpoint.broadcast(Payload::WakeWordDetected(WakeWordDetected {
        confidence: 0.9,
        keyword: String::from("yes-man"),
        audio_duration: Some(0.6),
    }));

    // THEN: The face still follows, but only the settings_update reached the core
    assert!(host.face().wait_for_phase(Phase::Listening, WAIT).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let received = endpoint.received();
    assert_eq!(received.len(), 1, "{received:?}");
    assert!(matches!(received[0].payload, Payload::SettingsUpdate(_)));

    host.shutdown().await;
    endpoint.shutdown();
}
