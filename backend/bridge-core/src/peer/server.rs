//! Core endpoint WebSocket server.
//!
//! # Security
//!
//! - Binds to `127.0.0.1` only
//! - Rejects non-loopback peers before the WebSocket handshake

use crate::error::bridge::BridgeError;
use crate::peer::handle::{ClientEntry, CoreEndpointHandle, EndpointShared};
use crate::protocol::{self, Decoded};
use crate::CORE_HOSTNAME;

use common::ErrorLocation;
use models::{Envelope, Origin, Payload, SystemStatus};

use std::net::SocketAddr;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn as TokioSpawn;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

/// Endpoint options.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Port on 127.0.0.1; 0 picks an ephemeral port.
    pub port: u16,
    /// Broadcast a heartbeat to every client on this interval.
    pub heartbeat_interval: Option<Duration>,
    /// Status sent to each client on connect.
    pub greeting: SystemStatus,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            port: 0,
            heartbeat_interval: None,
            greeting: SystemStatus {
                python_layer_connected: true,
                voicevox_connected: true,
                langflow_connected: true,
            },
        }
    }
}

/// Start the endpoint on `127.0.0.1:<port>`.
///
/// # Errors
///
/// Returns [`BridgeError::Bind`] if the port is in use or cannot be bound.
pub async fn start_core_endpoint(config: EndpointConfig) -> Result<CoreEndpointHandle, BridgeError> {
    let listener = TcpListener::bind((CORE_HOSTNAME, config.port)).await?;
    let addr = listener.local_addr()?;
    let shared = Arc::new(EndpointShared::new(config.greeting));

    info!("Core endpoint listening on ws://{}", addr);

    let accept_shared = Arc::clone(&shared);
    let accept_task = TokioSpawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("Client connecting from {}", peer);
                    let shared = Arc::clone(&accept_shared);
                    TokioSpawn(async move {
                        if let Err(e) = serve_client(stream, peer, shared).await {
                            warn!("Client {} failed: {}", peer, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Core endpoint accept failed: {}", e);
                    break;
                }
            }
        }
    });

    let heartbeat_task = config.heartbeat_interval.map(|interval| {
        let shared = Arc::clone(&shared);
        TokioSpawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !shared.is_silent() {
                    shared.broadcast(&Envelope::core(Payload::heartbeat()));
                }
            }
        })
    });

    Ok(CoreEndpointHandle::new(addr, shared, accept_task, heartbeat_task))
}

/// Handshake, register the client, greet it and spawn its reader and writer.
async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    shared: Arc<EndpointShared>,
) -> Result<(), BridgeError> {
    if !peer.ip().is_loopback() {
        warn!("Rejected non-loopback connection from {}", peer);
        return Ok(());
    }

    let ws_stream = accept_async(stream).await.map_err(|e| BridgeError::Connect {
        message: format!("WebSocket handshake with {} failed: {}", peer, e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let (write, read) = ws_stream.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let client_id = shared.next_client_id();

    let writer = TokioSpawn(write_loop(write, rx));
    let reader = TokioSpawn(read_loop(read, client_id, Arc::clone(&shared)));

    shared.register(
        client_id,
        ClientEntry {
            tx,
            reader: reader.abort_handle(),
            writer: writer.abort_handle(),
        },
    );
    info!("Client {} connected from {}", client_id, peer);

    if !shared.is_silent() {
        let greeting = Envelope::core(Payload::SystemStatus(shared.greeting()));
        shared.send_to(client_id, &greeting);
    }

    Ok(())
}

async fn write_loop(
    mut write: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = write.send(message).await {
            debug!("Client write failed: {}", e);
            break;
        }
    }
}

async fn read_loop(
    mut read: SplitStream<WebSocketStream<TcpStream>>,
    client_id: u64,
    shared: Arc<EndpointShared>,
) {
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_text(&shared, client_id, text.as_str()),
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => handle_text(&shared, client_id, text),
                Err(_) => shared.record_error(),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Client {} read failed: {}", client_id, e);
                shared.record_error();
                break;
            }
        }
    }

    info!("Client {} disconnected", client_id);
    shared.remove(client_id);
}

fn handle_text(shared: &EndpointShared, client_id: u64, text: &str) {
    match protocol::decode(text, Origin::Client) {
        Ok(Decoded::Envelope(envelope)) => {
            let is_heartbeat = matches!(envelope.payload, Payload::Heartbeat(_));
            shared.record_received(envelope);

            if is_heartbeat && !shared.is_silent() {
                shared.send_to(client_id, &Envelope::core(Payload::heartbeat()));
            }
        }
        Ok(Decoded::Unknown { kind, .. }) => {
            debug!("Client {} sent unknown kind {:?}", client_id, kind);
            shared.record_error();
        }
        Err(e) => {
            warn!("Client {} sent malformed envelope: {}", client_id, e);
            shared.record_error();
        }
    }
}
