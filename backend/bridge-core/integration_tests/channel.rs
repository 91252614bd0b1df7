use crate::helpers::{WAIT, closed_port_url, fast_config, start_endpoint, wait_until};

use bridge_core::bridge::BridgeChannel;
use bridge_core::peer::{EndpointConfig, start_core_endpoint};

use models::{AgentResponse, ConnectionStatus, Payload, UserInput};

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

fn user_input(text: &str) -> Payload {
    Payload::UserInput(UserInput {
        text: text.to_string(),
        session_id: None,
    })
}

fn texts(envelopes: &[models::Envelope]) -> Vec<String> {
    envelopes
        .iter()
        .filter_map(|envelope| match &envelope.payload {
            Payload::UserInput(input) => Some(input.text.clone()),
            _ => None,
        })
        .collect()
}

/// **VALUE**: Verifies envelopes sent before the link opens are delivered in order, before
/// anything sent afterwards.
///
/// **WHY THIS MATTERS**: The presentation layer sends while the core is still starting up.
/// Losing or reordering those messages would make the conversation incoherent.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The queue is flushed after (instead of before) new sends
/// - The queue is drained LIFO
/// - Queued envelopes are dropped on connect
#[tokio::test]
async fn given_sends_before_connect_when_link_opens_then_queue_flushed_in_order() {
    // GIVEN: A channel with three queued sends
    let endpoint = start_endpoint().await;
    let channel = BridgeChannel::spawn(fast_config(&endpoint.url()));
    channel.send(user_input("one"));
    channel.send(user_input("two"));
    channel.send(user_input("three"));

    // WHEN: Connecting, then sending again
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    channel.send(user_input("four"));

    // THEN: The core sees all four, in order
    let received = endpoint.wait_for_received(4, WAIT).await;
    assert_eq!(texts(&received), vec!["one", "two", "three", "four"]);
    assert!(channel.stats().sent >= 4);

    channel.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies the channel reconnects on its own after the core drops the link.
///
/// **BUG THIS CATCHES**: Would catch if link loss leaves the channel stuck in `disconnected`
/// or if the attempt counter is not reset after a successful reconnect.
#[tokio::test]
async fn given_connected_channel_when_core_drops_link_then_reconnects() {
    // GIVEN: A connected channel recording every status
    let endpoint = start_endpoint().await;
    let channel = BridgeChannel::spawn(fast_config(&endpoint.url()));
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&statuses);
    channel.on_status_change(move |snapshot| {
        recorder.lock().expect("lock").push(snapshot.status);
    });
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    assert!(endpoint.wait_for_clients(1, WAIT).await);

    // WHEN: The core drops every client
    assert_eq!(endpoint.drop_clients(), 1);

    // THEN: The channel goes through disconnected and back to connected
    let reconnected = wait_until(WAIT, || {
        let statuses = statuses.lock().expect("lock");
        statuses.iter().filter(|s| **s == ConnectionStatus::Connected).count() >= 2
    })
    .await;
    assert!(reconnected, "statuses: {:?}", statuses.lock().expect("lock"));
    assert!(statuses.lock().expect("lock").contains(&ConnectionStatus::Disconnected));
    assert_eq!(channel.status().attempt, 0);

    // AND: Messages still flow
    channel.send(user_input("after"));
    let received = endpoint.wait_for_received(1, WAIT).await;
    assert_eq!(texts(&received), vec!["after"]);

    channel.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies a silent core is detected and the link closed.
///
/// **WHY THIS MATTERS**: A hung core keeps the TCP connection open. Without a liveness
/// check the face would show a healthy state forever.
///
/// **BUG THIS CATCHES**: Would catch if outgoing heartbeats count as liveness, or if the
/// timeout check never runs.
#[tokio::test]
async fn given_silent_core_when_liveness_expires_then_link_closed() {
    // GIVEN: A core that never speaks and a short liveness timeout
    let endpoint = start_endpoint().await;
    endpoint.set_silent(true);

    let mut config = fast_config(&endpoint.url());
    config.liveness.heartbeat_interval_ms = 100;
    config.liveness.timeout_multiplier = 2;
    config.reconnect.base_delay_ms = 10_000;
    config.reconnect.max_delay_ms = 60_000;
    let channel = BridgeChannel::spawn(config);

    // WHEN: Connected and left idle
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);

    // THEN: The link is closed and a retry is scheduled
    assert!(channel.wait_for_status(ConnectionStatus::Disconnected, WAIT).await);
    assert_eq!(channel.stats().liveness_timeouts, 1);
    assert_eq!(channel.status().attempt, 1);

    // AND: Our own heartbeats reached the core
    assert!(wait_until(WAIT, || endpoint.heartbeats_received() >= 1).await);

    channel.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies the channel gives up after the configured number of reconnects.
///
/// **BUG THIS CATCHES**: Would catch an off-by-one in the attempt ceiling, or `connect()`
/// silently restarting a failed channel.
#[tokio::test]
async fn given_unreachable_core_when_attempts_exhausted_then_failed() {
    // GIVEN: A URL nothing listens on and two allowed reconnects
    let mut config = fast_config(&closed_port_url().await);
    config.reconnect.max_attempts = 2;
    config.reconnect.base_delay_ms = 20;
    let channel = BridgeChannel::spawn(config);

    // WHEN: Connecting
    channel.connect();

    // THEN: Initial attempt plus two reconnects, then failed
    assert!(channel.wait_for_status(ConnectionStatus::Failed, WAIT).await);
    assert_eq!(channel.stats().connect_failures, 3);
    assert_eq!(channel.status().attempt, 2);

    // AND: connect() does not leave the failed state
    channel.connect();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(channel.status().status, ConnectionStatus::Failed);

    channel.shutdown().await;
}

/// **VALUE**: Verifies `force_reconnect()` recovers a failed channel once the core is back.
///
/// **WHY THIS MATTERS**: After the ceiling is reached, the user's "reconnect" button is the
/// only way back.
#[tokio::test]
async fn given_failed_channel_when_core_returns_and_forced_then_connected() {
    // GIVEN: A core that goes away and a channel that gives up
    let endpoint = start_endpoint().await;
    let port = endpoint.addr().port();
    endpoint.shutdown();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut config = fast_config(&endpoint.url());
    config.reconnect.max_attempts = 1;
    config.reconnect.base_delay_ms = 20;
    let channel = BridgeChannel::spawn(config);
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Failed, WAIT).await);

    // WHEN: The core comes back on the same port and a reconnect is forced
    let revived = start_core_endpoint(EndpointConfig {
        port,
        ..EndpointConfig::default()
    })
    .await
    .expect("Failed to restart core endpoint");
    channel.force_reconnect();

    // THEN: Connected with a fresh attempt counter
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    assert_eq!(channel.status().attempt, 0);

    channel.shutdown().await;
    revived.shutdown();
}

/// **VALUE**: Verifies unknown kinds and malformed frames are dropped without closing the link.
///
/// **WHY THIS MATTERS**: A newer core may add kinds. One odd frame must not take the face
/// offline.
///
/// **BUG THIS CATCHES**: Would catch if decode errors are treated as transport errors, or if
/// unknown kinds reach subscribers.
#[tokio::test]
async fn given_unknown_and_malformed_frames_when_received_then_ignored_and_counted() {
    // GIVEN: A connected channel collecting messages
    let endpoint = start_endpoint().await;
    let channel = BridgeChannel::spawn(fast_config(&endpoint.url()));
    let kinds = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&kinds);
    channel.on_message(move |envelope| {
        recorder.lock().expect("lock").push(envelope.kind());
    });
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    assert!(endpoint.wait_for_clients(1, WAIT).await);

    // WHEN: The core sends an unknown kind, garbage and then a valid response
    endpoint.broadcast_raw(r#"{"type":"camera_frame","data":{},"id":"x1"}"#);
    endpoint.broadcast_raw("not json at all");
    endpoint.broadcast(Payload::AgentResponse(AgentResponse {
        text: String::from("hello"),
        execution_time_ms: 12,
        session_id: String::from("s1"),
    }));

    // THEN: Only the valid response is delivered, the rest is counted
    let delivered = wait_until(WAIT, || {
        kinds
            .lock()
            .expect("lock")
            .contains(&models::MessageKind::AgentResponse)
    })
    .await;
    assert!(delivered);
    let stats = channel.stats();
    assert_eq!(stats.ignored, 1);
    assert_eq!(stats.malformed, 1);
    assert_eq!(channel.status().status, ConnectionStatus::Connected);

    channel.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies status subscribers see each transition once, in order.
///
/// **BUG THIS CATCHES**: Would catch duplicate notifications for unchanged status or
/// notifications emitted out of order.
#[tokio::test]
async fn given_status_subscriber_when_connect_then_disconnect_then_sees_ordered_transitions() {
    // GIVEN: A fresh channel and a recording subscriber
    let endpoint = start_endpoint().await;
    let channel = BridgeChannel::spawn(fast_config(&endpoint.url()));
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&statuses);
    let subscription = channel.on_status_change(move |snapshot| {
        recorder.lock().expect("lock").push(snapshot.status);
    });

    // WHEN: Connecting (twice) and disconnecting
    channel.connect();
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    channel.disconnect();
    assert!(
        wait_until(WAIT, || statuses.lock().expect("lock").len() >= 3).await,
        "statuses: {:?}",
        statuses.lock().expect("lock")
    );

    // THEN: Exactly connecting, connected, disconnected
    assert_eq!(
        *statuses.lock().expect("lock"),
        vec![
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Disconnected
        ]
    );

    // AND: A removed subscriber hears nothing more
    assert!(channel.unsubscribe_status(subscription));
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    assert_eq!(statuses.lock().expect("lock").len(), 3);

    channel.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies `disconnect()` stops automatic reconnection.
#[tokio::test]
async fn given_disconnected_by_user_when_time_passes_then_stays_disconnected() {
    let endpoint = start_endpoint().await;
    let channel = BridgeChannel::spawn(fast_config(&endpoint.url()));
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);

    channel.disconnect();
    assert!(channel.wait_for_status(ConnectionStatus::Disconnected, WAIT).await);
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(channel.status().status, ConnectionStatus::Disconnected);
    assert!(wait_until(WAIT, || endpoint.client_count() == 0).await);

    channel.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies shutdown closes the link and stops the actor.
#[tokio::test]
async fn given_connected_channel_when_shutdown_then_link_closed_and_sends_ignored() {
    let endpoint = start_endpoint().await;
    let channel = BridgeChannel::spawn(fast_config(&endpoint.url()));
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);

    channel.shutdown().await;

    assert_eq!(channel.status().status, ConnectionStatus::Disconnected);
    assert!(wait_until(WAIT, || endpoint.client_count() == 0).await);

    // Sending after shutdown must not panic.
    channel.send(user_input("late"));
    endpoint.shutdown();
}

/// **VALUE**: Verifies envelopes sent while the link is down are delivered in order after
/// the reconnect, ahead of anything sent once the link is back.
///
/// **WHY THIS MATTERS**: A core restart in the middle of a conversation must not drop or
/// reorder what the user typed while it was away.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The queue is only flushed on the first connect
/// - Sends made while `disconnected` go to the dead link instead of the queue
/// - A post-reconnect send overtakes the queued ones
#[tokio::test]
async fn given_link_lost_when_sending_then_reconnect_delivers_queued_first_in_order() {
    // GIVEN: A connected channel whose retry delay leaves room to send while down
    let endpoint = start_endpoint().await;
    let mut config = fast_config(&endpoint.url());
    config.reconnect.base_delay_ms = 500;
    config.reconnect.max_delay_ms = 1_000;
    let channel = BridgeChannel::spawn(config);
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    assert!(endpoint.wait_for_clients(1, WAIT).await);
    channel.send(user_input("before"));
    assert_eq!(texts(&endpoint.wait_for_received(1, WAIT).await), vec!["before"]);

    // WHEN: The core drops the link and three sends happen while disconnected
    assert_eq!(endpoint.drop_clients(), 1);
    assert!(channel.wait_for_status(ConnectionStatus::Disconnected, WAIT).await);
    channel.send(user_input("one"));
    channel.send(user_input("two"));
    channel.send(user_input("three"));

    // AND: The channel reconnects and one more is sent
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    channel.send(user_input("four"));

    // THEN: The core sees the queued three in order, then the new one
    let received = endpoint.wait_for_received(5, WAIT).await;
    assert_eq!(
        texts(&received),
        vec!["before", "one", "two", "three", "four"]
    );

    channel.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies a silent link is closed within one monitoring tick of the timeout
/// expiring, and not before.
///
/// **WHY THIS MATTERS**: The face shows the error state off the back of this timeout. Firing
/// early flaps the face on a slow core; firing late leaves a dead core looking healthy.
///
/// **BUG THIS CATCHES**: Would catch if the timeout is measured from the last heartbeat we
/// sent, if the check runs on the heartbeat cadence instead of its own tick, or if silence
/// equal to the timeout already counts as expired.
#[tokio::test]
async fn given_silent_core_when_timeout_elapses_then_closed_within_one_check_tick() {
    // GIVEN: A core that never speaks, 200ms timeout checked every 20ms
    let endpoint = start_endpoint().await;
    endpoint.set_silent(true);

    let mut config = fast_config(&endpoint.url());
    config.liveness.heartbeat_interval_ms = 100;
    config.liveness.timeout_multiplier = 2;
    config.reconnect.base_delay_ms = 10_000;
    config.reconnect.max_delay_ms = 60_000;
    let timeout = config.liveness_timeout();
    let bound = timeout + config.check_interval() + Duration::from_millis(100);
    let channel = BridgeChannel::spawn(config);

    let lost = Arc::new(Mutex::new(None));
    let recorder = Arc::clone(&lost);
    channel.on_status_change(move |snapshot| {
        if snapshot.status == ConnectionStatus::Disconnected {
            let mut lost = recorder.lock().expect("lock");
            if lost.is_none() {
                *lost = snapshot.last_liveness.map(|last| (last, SystemTime::now()));
            }
        }
    });

    // WHEN: Connected and left idle
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    assert!(wait_until(WAIT, || lost.lock().expect("lock").is_some()).await);

    // THEN: Silence ran past the timeout, and by no more than one tick plus slack
    let recorded = *lost.lock().expect("lock");
    let (last_inbound, closed_at) = recorded.expect("recorded");
    let silence = closed_at
        .duration_since(last_inbound)
        .expect("closed after the last inbound frame");
    assert!(silence > timeout, "closed after only {silence:?} (timeout {timeout:?})");
    assert!(silence <= bound, "closed after {silence:?}, bound {bound:?}");
    assert_eq!(channel.stats().liveness_timeouts, 1);

    channel.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies any inbound envelope, not just heartbeats, keeps the link alive.
///
/// **WHY THIS MATTERS**: A busy core streaming responses may not send a heartbeat for a
/// while. That traffic proves the core is alive.
///
/// **BUG THIS CATCHES**: Would catch a liveness check that only resets on `heartbeat`
/// envelopes, which would drop a healthy link mid-conversation.
#[tokio::test]
async fn given_core_sending_non_heartbeat_traffic_when_past_timeout_then_stays_connected() {
    // GIVEN: A core with heartbeats off and a 200ms timeout
    let endpoint = start_endpoint().await;
    endpoint.set_silent(true);

    let mut config = fast_config(&endpoint.url());
    config.liveness.heartbeat_interval_ms = 100;
    config.liveness.timeout_multiplier = 2;
    config.reconnect.base_delay_ms = 10_000;
    config.reconnect.max_delay_ms = 60_000;
    let channel = BridgeChannel::spawn(config);
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    assert!(endpoint.wait_for_clients(1, WAIT).await);

    // WHEN: The core sends an agent response every 50ms for 800ms
    for _ in 0..16 {
        endpoint.broadcast(Payload::AgentResponse(AgentResponse {
            text: String::from("streaming"),
            execution_time_ms: 5,
            session_id: String::from("s-1"),
        }));
        tokio::time::sleep(Duration::from_millis(50)).await;

        // THEN: The link never drops
        assert_eq!(channel.status().status, ConnectionStatus::Connected);
    }
    assert_eq!(channel.stats().liveness_timeouts, 0);
    assert!(channel.stats().received >= 1);

    // AND: Once the traffic stops, the timeout still fires
    assert!(channel.wait_for_status(ConnectionStatus::Disconnected, WAIT).await);
    assert_eq!(channel.stats().liveness_timeouts, 1);

    channel.shutdown().await;
    endpoint.shutdown();
}

/// **VALUE**: Verifies a core that accepts the link and then stops reading cannot wedge the
/// channel.
///
/// **WHY THIS MATTERS**: Once the socket buffers fill, every write blocks. If writes ran on
/// the channel task, the liveness check, `disconnect()` and `shutdown()` would all stall
/// behind them and the face would show a healthy core forever.
///
/// **BUG THIS CATCHES**: Would catch socket writes awaited inline on the channel task, or a
/// shutdown that waits on a write that can never finish.
#[tokio::test]
async fn given_core_that_never_reads_when_sending_large_backlog_then_link_dropped_and_shutdown_completes() {
    // GIVEN: A core that completes the handshake and then neither reads nor writes
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stalled core");
    let url = format!("ws://{}", listener.local_addr().expect("No address"));
    let stalled_core = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let _link = accept_async(stream).await.expect("handshake");
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let mut config = fast_config(&url);
    config.liveness.heartbeat_interval_ms = 100;
    config.liveness.timeout_multiplier = 3;
    config.reconnect.base_delay_ms = 10_000;
    config.reconnect.max_delay_ms = 60_000;
    let channel = BridgeChannel::spawn(config);
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);

    // WHEN: Far more is sent than the socket buffers can hold
    let chunk = "x".repeat(1024 * 1024);
    for _ in 0..64 {
        channel.send(user_input(&chunk));
    }

    // THEN: The link is dropped instead of hanging in `connected`
    assert!(
        channel.wait_for_status(ConnectionStatus::Disconnected, WAIT).await,
        "status: {:?}",
        channel.status()
    );
    assert!(channel.stats().sent < 64);

    // AND: Shutdown still completes promptly
    let shutdown = tokio::time::timeout(WAIT, channel.shutdown()).await;
    assert!(shutdown.is_ok(), "shutdown hung behind a blocked write");

    stalled_core.abort();
}

/// **VALUE**: Verifies a WebSocket ping from the core is answered with a pong and counts as
/// traffic.
///
/// **WHY THIS MATTERS**: Some cores use protocol pings as their keepalive. The pong goes out
/// through the same writer as envelopes, so an unanswered ping means that path is broken.
///
/// **BUG THIS CATCHES**: Would catch a pong that is queued but never flushed, or a ping that
/// does not refresh liveness.
#[tokio::test]
async fn given_core_ping_when_received_then_pong_returned_and_liveness_refreshed() {
    // GIVEN: A hand-driven core and a connected channel
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind core");
    let url = format!("ws://{}", listener.local_addr().expect("No address"));
    let (ping_tx, ping_rx) = tokio::sync::oneshot::channel::<()>();
    let core = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut link = accept_async(stream).await.expect("handshake");
        ping_rx.await.expect("ping signal");

        // WHEN: The core pings
        link.send(Message::Ping(b"alive".to_vec().into()))
            .await
            .expect("ping");

        loop {
            match link.next().await {
                Some(Ok(Message::Pong(payload))) => return payload.to_vec(),
                Some(Ok(_)) => continue,
                other => panic!("Link ended before pong: {other:?}"),
            }
        }
    });

    let channel = BridgeChannel::spawn(fast_config(&url));
    channel.connect();
    assert!(channel.wait_for_status(ConnectionStatus::Connected, WAIT).await);
    let connected_liveness = channel.status().last_liveness;
    ping_tx.send(()).expect("core task alive");

    // THEN: The pong echoes the ping payload
    let pong = tokio::time::timeout(WAIT, core)
        .await
        .expect("no pong before timeout")
        .expect("core task");
    assert_eq!(pong, b"alive".to_vec());

    // AND: The ping moved the liveness timestamp forward
    assert!(
        wait_until(WAIT, || channel.status().last_liveness > connected_liveness).await,
        "liveness not refreshed by ping"
    );

    channel.shutdown().await;
}
