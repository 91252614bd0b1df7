use crate::helpers::{WAIT, start_endpoint};

use bridge_core::peer::{EndpointConfig, start_core_endpoint};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use std::time::Duration;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(url: &str) -> Client {
    let (ws, _) = connect_async(url)
        .await
        .expect("Failed to connect to core endpoint");
    ws
}

async fn next_json(ws: &mut Client) -> serde_json::Value {
    let frame = tokio::time::timeout(WAIT, ws.next())
        .await
        .expect("Timed out waiting for frame")
        .expect("Stream ended")
        .expect("Read failed");
    match frame {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("Frame is not JSON"),
        other => panic!("Expected text frame, got {:?}", other),
    }
}

/// **VALUE**: Verifies new clients are greeted with the endpoint's system status.
///
/// **WHY THIS MATTERS**: The face shows service health immediately on connect; the
/// greeting is how the core reports it.
#[tokio::test]
async fn given_new_client_when_connected_then_greeted_with_system_status() {
    // GIVEN: A running endpoint
    let endpoint = start_endpoint().await;

    // WHEN: A raw client connects
    let mut ws = connect(&endpoint.url()).await;

    // THEN: The first frame is system_status with core-side field names
    let greeting = next_json(&mut ws).await;
    assert_eq!(greeting["type"], "system_status");
    assert_eq!(greeting["source"], "core");
    assert_eq!(greeting["data"]["pythonLayerConnected"], true);
    assert!(greeting["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(greeting["timestamp"].is_string());

    endpoint.shutdown();
}

/// **VALUE**: Verifies heartbeats are answered and recorded.
///
/// **BUG THIS CATCHES**: Would catch if the endpoint stops replying to heartbeats, which
/// would make every channel under test hit its liveness timeout.
#[tokio::test]
async fn given_client_heartbeat_when_received_then_endpoint_replies() {
    // GIVEN: A connected raw client past its greeting
    let endpoint = start_endpoint().await;
    let mut ws = connect(&endpoint.url()).await;
    let _greeting = next_json(&mut ws).await;

    // WHEN: Sending a heartbeat without id or timestamp
    ws.send(Message::Text(r#"{"type":"heartbeat","data":{}}"#.into()))
        .await
        .expect("Failed to send heartbeat");

    // THEN: A heartbeat comes back and is counted
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "heartbeat");
    assert_eq!(endpoint.heartbeats_received(), 1);
    assert!(endpoint.received().is_empty());

    endpoint.shutdown();
}

/// **VALUE**: Verifies unknown or malformed client frames are counted, not recorded.
#[tokio::test]
async fn given_bad_client_frames_when_received_then_counted_as_errors() {
    let endpoint = start_endpoint().await;
    let mut ws = connect(&endpoint.url()).await;
    let _greeting = next_json(&mut ws).await;

    ws.send(Message::Text(r#"{"type":"camera_frame","data":{}}"#.into()))
        .await
        .expect("send");
    ws.send(Message::Text("{{{".into())).await.expect("send");
    ws.send(Message::Text(
        r#"{"type":"user_input","data":{"text":"hi"},"id":"u1"}"#.into(),
    ))
    .await
    .expect("send");

    let received = endpoint.wait_for_received(1, WAIT).await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].id, "u1");
    assert_eq!(endpoint.stats().errors, 2);

    endpoint.shutdown();
}

/// **VALUE**: Verifies a silent endpoint sends nothing on its own.
#[tokio::test]
async fn given_silent_endpoint_when_client_connects_then_no_greeting_or_heartbeats() {
    // GIVEN: A silent endpoint with a fast heartbeat broadcast
    let endpoint = start_core_endpoint(EndpointConfig {
        heartbeat_interval: Some(Duration::from_millis(20)),
        ..EndpointConfig::default()
    })
    .await
    .expect("Failed to start core endpoint");
    endpoint.set_silent(true);

    // WHEN: A client connects and waits
    let mut ws = connect(&endpoint.url()).await;
    let frame = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;

    // THEN: Nothing arrived
    assert!(frame.is_err(), "unexpected frame: {:?}", frame);

    endpoint.shutdown();
}

/// **VALUE**: Verifies binding an occupied port reports a bind error instead of panicking.
#[tokio::test]
async fn given_port_in_use_when_starting_endpoint_then_bind_error() {
    let first = start_endpoint().await;

    let result = start_core_endpoint(EndpointConfig {
        port: first.addr().port(),
        ..EndpointConfig::default()
    })
    .await;

    assert!(matches!(
        result,
        Err(bridge_core::error::bridge::BridgeError::Bind { .. })
    ));
    first.shutdown();
}
