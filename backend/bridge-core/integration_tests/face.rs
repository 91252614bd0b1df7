use crate::helpers::{WAIT, fast_config, start_endpoint, wait_until};

use bridge_core::bridge::BridgeChannel;
use bridge_core::face::{FaceStore, attach_face};

use models::{
    ConnectionStatus, Expression, ParameterOverrides, Payload, Phase, SystemStatus, TtsEnd,
    WakeWordDetected,
};

use std::time::Duration;

fn wake_word() -> Payload {
    Payload::WakeWordDetected(WakeWordDetected {
        confidence: 0.93,
        keyword: String::from("yes-man"),
        audio_duration: None,
    })
}

/// **VALUE**: Verifies a core event drives the face and the change is echoed back.
///
/// **WHY THIS MATTERS**: This is the whole point of the bridge: the core says "wake word",
/// the face starts listening, and the core learns what the face is showing.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Message subscribers are not wired into the face store
/// - The echo sends the previous state instead of the new one
/// - The echo fires for envelopes that do not change the face
#[tokio::test]
async fn given_attached_face_when_wake_word_arrives_then_listening_and_echoed() {
    // GIVEN: A connected channel with an echoing face
    let endpoint = start_endpoint().await;
    let channel = BridgeChannel::spawn(fast_config(&endpoint.url()));
    let face = FaceStore::spawn(ParameterOverrides::default());
    let _link = attach_face(&channel, &face, true);
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    assert!(endpoint.wait_for_clients(1, WAIT).await);

    // WHEN: The core reports a wake word
    endpoint.broadcast(wake_word());

    // THEN: The face listens with an excited expression
    assert!(face.wait_for_phase(Phase::Listening, WAIT).await);
    assert_eq!(face.snapshot().expression, Expression::Excited);

    // AND: The core receives exactly one face_state_change
    let received = endpoint.wait_for_received(1, WAIT).await;
    assert_eq!(received.len(), 1);
    match &received[0].payload {
        Payload::FaceStateChange(change) => {
            assert_eq!(change.state, Phase::Listening);
            assert_eq!(change.expression, Expression::Excited);
        }
        other => panic!("Expected face_state_change, got {:?}", other),
    }

    channel.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies losing the core puts the face into the error state.
///
/// **BUG THIS CATCHES**: Would catch if status subscribers are not wired, or if the face
/// stays in its last conversational phase after the link drops.
#[tokio::test]
async fn given_attached_face_when_link_lost_then_face_shows_error() {
    // GIVEN: A connected channel and a face mid-conversation
    let endpoint = start_endpoint().await;
    let channel = BridgeChannel::spawn(fast_config(&endpoint.url()));
    let face = FaceStore::spawn(ParameterOverrides::default());
    let _link = attach_face(&channel, &face, false);
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    assert!(endpoint.wait_for_clients(1, WAIT).await);
    endpoint.broadcast(wake_word());
    assert!(face.wait_for_phase(Phase::Listening, WAIT).await);

    // WHEN: The link is closed
    channel.disconnect();

    // THEN: Error phase, sad expression
    assert!(face.wait_for_phase(Phase::Error, WAIT).await);
    assert_eq!(face.snapshot().expression, Expression::Sad);

    channel.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies an unhealthy core status is shown even while the link is up.
#[tokio::test]
async fn given_core_reports_unhealthy_when_status_arrives_then_face_shows_error() {
    let endpoint = start_endpoint().await;
    let channel = BridgeChannel::spawn(fast_config(&endpoint.url()));
    let face = FaceStore::spawn(ParameterOverrides::default());
    let _link = attach_face(&channel, &face, false);
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    assert!(endpoint.wait_for_clients(1, WAIT).await);

    endpoint.broadcast(Payload::SystemStatus(SystemStatus {
        python_layer_connected: false,
        voicevox_connected: true,
        langflow_connected: true,
    }));

    assert!(face.wait_for_phase(Phase::Error, WAIT).await);
    assert_eq!(channel.status().status, ConnectionStatus::Connected);

    channel.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies a detached face no longer follows the channel.
///
/// **BUG THIS CATCHES**: Would catch subscriptions leaking past `detach()`, which would keep
/// a torn-down face (and its echo) alive.
#[tokio::test]
async fn given_detached_face_when_events_arrive_then_face_unchanged() {
    // GIVEN: A face that was attached then detached
    let endpoint = start_endpoint().await;
    let channel = BridgeChannel::spawn(fast_config(&endpoint.url()));
    let face = FaceStore::spawn(ParameterOverrides::default());
    let link = attach_face(&channel, &face, true);
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    assert!(endpoint.wait_for_clients(1, WAIT).await);

    link.detach();
    link.detach();
    assert!(link.is_detached());

    // WHEN: The core sends events
    endpoint.broadcast(wake_word());
    endpoint.broadcast(Payload::TtsEnd(TtsEnd {}));
    assert!(wait_until(WAIT, || channel.stats().received >= 3).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // THEN: The face never moved and nothing was echoed
    assert_eq!(face.snapshot().phase, Phase::Idle);
    assert_eq!(face.snapshot().revision, 0);
    assert!(endpoint.received().is_empty());

    channel.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies override changes reach the snapshot without being echoed as state.
#[tokio::test]
async fn given_echoing_face_when_overrides_change_then_parameters_update_without_echo() {
    let endpoint = start_endpoint().await;
    let channel = BridgeChannel::spawn(fast_config(&endpoint.url()));
    let face = FaceStore::spawn(ParameterOverrides::default());
    let _link = attach_face(&channel, &face, true);
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);

    let snapshot = face
        .set_overrides(ParameterOverrides {
            glow_intensity: Some(0.25),
            ..ParameterOverrides::default()
        })
        .await
        .expect("valid overrides");

    assert_eq!(snapshot.parameters.glow_intensity, 0.25);
    assert_eq!(snapshot.phase, Phase::Idle);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(endpoint.received().is_empty());

    channel.shutdown().await;
    endpoint.shutdown();
}
