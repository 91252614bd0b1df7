//! One open WebSocket link, split into a read half and a writer task.
//!
//! The channel actor polls [`Link::next_event`] for inbound frames and hands
//! outgoing frames to the writer over an unbounded mpsc, so a peer that stops
//! reading can never block the actor. A single write that makes no progress
//! for `write_timeout` ends the writer; the envelopes it still held come back
//! in [`WriterExit::unsent`] for requeueing.

use crate::bridge::stats::ChannelStats;
use crate::error::bridge::BridgeError;

use common::ErrorLocation;
use models::Envelope;

use std::future::pending;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, trace, warn};
use tokio::net::TcpStream;
use tokio::spawn as TokioSpawn;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub(crate) type WsLink = WebSocketStream<MaybeTlsStream<TcpStream>>;

type LinkSink = SplitSink<WsLink, Message>;
type LinkStream = SplitStream<WsLink>;

/// Frames handed to the writer task.
pub(crate) enum Outgoing {
    Envelope { envelope: Envelope, text: String },
    /// Never requeued.
    Heartbeat(String),
    /// Push out control frames (pongs) queued by the read half.
    Flush,
}

/// What the writer had left when it stopped.
pub(crate) struct WriterExit {
    sink: LinkSink,
    pub unsent: Vec<Envelope>,
    pub error: Option<BridgeError>,
}

pub(crate) enum LinkEvent {
    Frame(Option<Result<Message, WsError>>),
    WriterStopped(Result<WriterExit, JoinError>),
}

pub(crate) struct Link {
    frames: LinkStream,
    outbox: mpsc::UnboundedSender<Outgoing>,
    stop: Option<oneshot::Sender<()>>,
    writer: JoinHandle<WriterExit>,
}

impl Link {
    pub fn spawn(stream: WsLink, stats: Arc<ChannelStats>, write_timeout: Duration) -> Self {
        let (sink, frames) = stream.split();
        let (outbox, outbox_rx) = mpsc::unbounded_channel();
        let (stop, stop_rx) = oneshot::channel();

        let writer = TokioSpawn(write_loop(sink, outbox_rx, stop_rx, stats, write_timeout));

        Self {
            frames,
            outbox,
            stop: Some(stop),
            writer,
        }
    }

    /// Hand a frame to the writer. Gives the frame back if the writer has
    /// already stopped.
    pub fn submit(&self, outgoing: Outgoing) -> Result<(), Outgoing> {
        self.outbox.send(outgoing).map_err(|e| e.0)
    }

    /// Next inbound frame or the writer stopping, whichever comes first.
    ///
    /// After [`LinkEvent::WriterStopped`] the link must be discarded.
    pub async fn next_event(&mut self) -> LinkEvent {
        tokio::select! {
            frame = self.frames.next() => LinkEvent::Frame(frame),
            exit = &mut self.writer => LinkEvent::WriterStopped(exit),
        }
    }

    /// Stop the writer, try a close handshake and return whatever the writer
    /// had not written yet. Bounded by `close_timeout` per step.
    pub async fn close(mut self, close_timeout: Duration) -> Vec<Envelope> {
        drop(self.outbox);
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }

        let exit = match tokio::time::timeout(close_timeout, &mut self.writer).await {
            Ok(Ok(exit)) => exit,
            Ok(Err(e)) => {
                warn!("Link writer ended abnormally: {}", e);
                return Vec::new();
            }
            Err(_) => {
                self.writer.abort();
                debug!("Link writer did not stop in time");
                return Vec::new();
            }
        };

        let WriterExit { mut sink, unsent, .. } = exit;
        match tokio::time::timeout(close_timeout, sink.close()).await {
            Ok(Ok(())) => debug!("Link closed"),
            Ok(Err(e)) => debug!("Link close error: {}", e),
            Err(_) => debug!("Link close timed out"),
        }

        unsent
    }
}

/// Wait on the link if there is one.
pub(crate) async fn next_link_event(link: &mut Option<Link>) -> LinkEvent {
    match link.as_mut() {
        Some(link) => link.next_event().await,
        None => pending().await,
    }
}

enum Written {
    Done,
    Stopped,
    Failed(BridgeError),
}

async fn write_loop(
    mut sink: LinkSink,
    mut outbox: mpsc::UnboundedReceiver<Outgoing>,
    mut stop: oneshot::Receiver<()>,
    stats: Arc<ChannelStats>,
    write_timeout: Duration,
) -> WriterExit {
    loop {
        let next = tokio::select! {
            biased;
            _ = &mut stop => None,
            next = outbox.recv() => next,
        };
        let Some(outgoing) = next else {
            return stopped(sink, None, outbox, None);
        };

        let written = {
            let write = async {
                match &outgoing {
                    Outgoing::Envelope { text, .. } | Outgoing::Heartbeat(text) => {
                        sink.send(Message::Text(text.clone().into())).await
                    }
                    Outgoing::Flush => sink.flush().await,
                }
            };

            tokio::select! {
                biased;
                _ = &mut stop => Written::Stopped,
                result = tokio::time::timeout(write_timeout, write) => match result {
                    Ok(Ok(())) => Written::Done,
                    Ok(Err(e)) => Written::Failed(BridgeError::from(e)),
                    Err(_) => {
                        stats.record_write_stall();
                        Written::Failed(BridgeError::Timeout {
                            message: format!("write made no progress for {write_timeout:?}"),
                            location: ErrorLocation::from(Location::caller()),
                        })
                    }
                },
            }
        };

        match written {
            Written::Done => match &outgoing {
                Outgoing::Envelope { envelope, .. } => {
                    stats.record_sent();
                    trace!("Sent {} envelope {}", envelope.kind(), envelope.id);
                }
                Outgoing::Heartbeat(_) => {
                    stats.record_sent();
                    trace!("Sent heartbeat");
                }
                Outgoing::Flush => {}
            },
            Written::Stopped => return stopped(sink, Some(outgoing), outbox, None),
            Written::Failed(e) => return stopped(sink, Some(outgoing), outbox, Some(e)),
        }
    }
}

/// Collect the in-flight frame and everything still in the outbox. Closing the
/// receiver first makes later submits fail instead of vanishing.
fn stopped(
    sink: LinkSink,
    in_flight: Option<Outgoing>,
    mut outbox: mpsc::UnboundedReceiver<Outgoing>,
    error: Option<BridgeError>,
) -> WriterExit {
    outbox.close();

    let mut unsent = Vec::new();
    let mut collect = |outgoing: Outgoing| {
        if let Outgoing::Envelope { envelope, .. } = outgoing {
            unsent.push(envelope);
        }
    };

    if let Some(outgoing) = in_flight {
        collect(outgoing);
    }
    while let Ok(outgoing) = outbox.try_recv() {
        collect(outgoing);
    }

    WriterExit {
        sink,
        unsent,
        error,
    }
}
