//! Transport channel to the processing core.
//!
//! A [`BridgeChannel`] is a cheap, cloneable handle. The read half of the
//! socket, the outbound queue, the liveness monitor and the reconnect timer all
//! belong to a single actor task; handles talk to it over an unbounded mpsc so
//! [`BridgeChannel::send`] never blocks and never fails. Socket writes run on a
//! separate writer task per link, so a core that stops reading cannot stall
//! the actor.
//!
//! # Lifecycle
//!
//! ```text
//! disconnected --connect()--> connecting --open--> connected
//!      ^                          |                    |
//!      |        (error/timeout)   |   (close/timeout)  |
//!      +----- backoff timer <-----+--------------------+
//!                  |
//!          (ceiling reached)
//!                  v
//!               failed  --force_reconnect()--> connecting
//! ```
//!
//! Envelopes sent while not connected are queued and flushed in order, exactly
//! once per transition into `connected`, before anything sent afterwards.

use crate::bridge::link::{Link, LinkEvent, Outgoing, WriterExit, WsLink, next_link_event};
use crate::bridge::liveness::LivenessMonitor;
use crate::bridge::outbound::OutboundQueue;
use crate::bridge::reconnect::ReconnectPolicy;
use crate::bridge::stats::{ChannelStats, StatsSnapshot};
use crate::config::BridgeConfig;
use crate::error::bridge::BridgeError;
use crate::protocol::{self, Decoded};
use crate::pubsub::{Subscribers, SubscriptionId};

use common::ErrorLocation;
use models::{ConnectionSnapshot, ConnectionStatus, Envelope, Origin, Payload};

use std::future::{Future, pending};
use std::panic::Location;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use log::{debug, error, info, trace, warn};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{MissedTickBehavior, Sleep, sleep};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

type PendingConnect = Pin<Box<dyn Future<Output = Result<WsLink, BridgeError>> + Send>>;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Commands processed by the channel actor.
#[derive(Debug)]
enum ChannelCommand {
    Connect,
    Send(Envelope),
    ForceReconnect,
    Disconnect,
    Shutdown(oneshot::Sender<()>),
}

/// Handle to the transport channel.
///
/// All clones share the same actor. The actor stops on [`BridgeChannel::shutdown`]
/// or when the last handle is dropped.
#[derive(Clone)]
pub struct BridgeChannel {
    command_tx: mpsc::UnboundedSender<ChannelCommand>,
    status_rx: watch::Receiver<ConnectionSnapshot>,
    message_subscribers: Arc<Subscribers<Envelope>>,
    status_subscribers: Arc<Subscribers<ConnectionSnapshot>>,
    stats: Arc<ChannelStats>,
    endpoint: Arc<str>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl BridgeChannel {
    /// Spawn the channel actor. The channel starts `disconnected`; call
    /// [`BridgeChannel::connect`] to open the link.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: BridgeConfig) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionSnapshot::default());
        let message_subscribers = Arc::new(Subscribers::new());
        let status_subscribers = Arc::new(Subscribers::new());
        let stats = Arc::new(ChannelStats::default());
        let endpoint: Arc<str> = Arc::from(config.core.url.as_str());

        let actor = ChannelActor {
            queue: OutboundQueue::new(config.queue.capacity),
            policy: ReconnectPolicy::new(&config.reconnect),
            monitor: LivenessMonitor::new(config.heartbeat_interval(), config.liveness_timeout()),
            config,
            command_rx,
            status_tx,
            message_subscribers: Arc::clone(&message_subscribers),
            status_subscribers: Arc::clone(&status_subscribers),
            stats: Arc::clone(&stats),
            snapshot: ConnectionSnapshot::default(),
            link: None,
            pending_connect: None,
            retry_timer: None,
            auto_reconnect: false,
        };

        let task = tokio::spawn(actor.run());
        info!("Bridge channel spawned for {}", endpoint);

        Self {
            command_tx,
            status_rx,
            message_subscribers,
            status_subscribers,
            stats,
            endpoint,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    /// Open the link. No-op while `connecting`/`connected` or after terminal
    /// failure; while waiting on a backoff timer it retries immediately.
    pub fn connect(&self) {
        self.command(ChannelCommand::Connect);
    }

    /// Queue a client payload for delivery. Returns the envelope id.
    pub fn send(&self, payload: Payload) -> String {
        let envelope = Envelope::client(payload);
        let id = envelope.id.clone();
        self.send_envelope(envelope);
        id
    }

    /// Transmit now if connected, otherwise queue. Never blocks.
    pub fn send_envelope(&self, envelope: Envelope) {
        self.command(ChannelCommand::Send(envelope));
    }

    /// Reset the attempt counter, cancel pending work and connect immediately.
    pub fn force_reconnect(&self) {
        self.command(ChannelCommand::ForceReconnect);
    }

    /// Close the link and stop reconnecting until the next [`BridgeChannel::connect`].
    pub fn disconnect(&self) {
        self.command(ChannelCommand::Disconnect);
    }

    /// Cancel timers, close the transport and wait for the actor to finish.
    pub async fn shutdown(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.command_tx.send(ChannelCommand::Shutdown(reply_tx)).is_ok() {
            let _ = reply_rx.await;
        }

        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Bridge channel task ended abnormally: {}", e);
            }
        }
    }

    pub fn status(&self) -> ConnectionSnapshot {
        *self.status_rx.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.status_rx.clone()
    }

    /// Wait until the channel reports `status`. Returns `false` on timeout.
    pub async fn wait_for_status(&self, status: ConnectionStatus, timeout: Duration) -> bool {
        let mut status_rx = self.status_rx.clone();
        let reached = tokio::time::timeout(timeout, async move {
            status_rx
                .wait_for(|snapshot| snapshot.status == status)
                .await
                .is_ok()
        })
        .await;

        matches!(reached, Ok(true))
    }

    /// Subscribe to decoded inbound envelopes. Handlers run on the channel task
    /// in arrival order and must not block.
    pub fn on_message<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.message_subscribers.subscribe(handler)
    }

    /// Subscribe to status changes. Handlers run on the channel task.
    pub fn on_status_change<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ConnectionSnapshot) + Send + Sync + 'static,
    {
        self.status_subscribers.subscribe(handler)
    }

    pub fn unsubscribe_message(&self, id: SubscriptionId) -> bool {
        self.message_subscribers.unsubscribe(id)
    }

    pub fn unsubscribe_status(&self, id: SubscriptionId) -> bool {
        self.status_subscribers.unsubscribe(id)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn command(&self, command: ChannelCommand) {
        if let Err(e) = self.command_tx.send(command) {
            debug!("Bridge channel stopped, dropping {:?}", e.0);
        }
    }
}

enum Event {
    Command(Option<ChannelCommand>),
    Opened(Result<WsLink, BridgeError>),
    RetryDue,
    Link(LinkEvent),
    Tick,
}

/// Owns every piece of mutable channel state.
struct ChannelActor {
    config: BridgeConfig,
    command_rx: mpsc::UnboundedReceiver<ChannelCommand>,
    status_tx: watch::Sender<ConnectionSnapshot>,
    message_subscribers: Arc<Subscribers<Envelope>>,
    status_subscribers: Arc<Subscribers<ConnectionSnapshot>>,
    stats: Arc<ChannelStats>,
    queue: OutboundQueue,
    policy: ReconnectPolicy,
    monitor: LivenessMonitor,
    snapshot: ConnectionSnapshot,
    link: Option<Link>,
    pending_connect: Option<PendingConnect>,
    retry_timer: Option<Pin<Box<Sleep>>>,
    /// Cleared by `disconnect()`; link loss then stays `disconnected`.
    auto_reconnect: bool,
}

impl ChannelActor {
    async fn run(mut self) {
        let mut tick = tokio::time::interval(self.config.check_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                command = self.command_rx.recv() => Event::Command(command),
                opened = poll_optional(&mut self.pending_connect) => Event::Opened(opened),
                _ = poll_optional(&mut self.retry_timer) => Event::RetryDue,
                event = next_link_event(&mut self.link) => Event::Link(event),
                _ = tick.tick() => Event::Tick,
            };

            match event {
                Event::Command(Some(ChannelCommand::Shutdown(reply))) => {
                    self.teardown().await;
                    let _ = reply.send(());
                    break;
                }
                Event::Command(None) => {
                    debug!("All bridge channel handles dropped");
                    self.teardown().await;
                    break;
                }
                Event::Command(Some(command)) => self.handle_command(command).await,
                Event::Opened(result) => {
                    self.pending_connect = None;
                    self.handle_opened(result);
                }
                Event::RetryDue => {
                    self.retry_timer = None;
                    self.start_attempt();
                }
                Event::Link(LinkEvent::Frame(frame)) => self.handle_frame(frame).await,
                Event::Link(LinkEvent::WriterStopped(exit)) => self.handle_writer_stopped(exit),
                Event::Tick => self.handle_tick().await,
            }
        }

        info!("Bridge channel for {} stopped", self.config.core.url);
    }

    async fn handle_command(&mut self, command: ChannelCommand) {
        match command {
            ChannelCommand::Connect => self.connect(),
            ChannelCommand::Send(envelope) => self.send(envelope),
            ChannelCommand::ForceReconnect => {
                info!("Forced reconnect to {}", self.config.core.url);
                self.cancel_pending();
                self.close_link().await;
                self.policy.reset();
                self.snapshot.attempt = 0;
                self.auto_reconnect = true;
                self.start_attempt();
            }
            ChannelCommand::Disconnect => {
                info!("Disconnecting from {}", self.config.core.url);
                self.auto_reconnect = false;
                self.cancel_pending();
                self.close_link().await;
                self.policy.reset();
                self.snapshot.attempt = 0;
                self.set_status(ConnectionStatus::Disconnected);
            }
            ChannelCommand::Shutdown(_) => {}
        }
    }

    fn connect(&mut self) {
        match self.snapshot.status {
            ConnectionStatus::Connecting | ConnectionStatus::Connected => {
                debug!("connect() ignored: already {}", self.snapshot.status);
            }
            ConnectionStatus::Failed => {
                warn!("connect() ignored: connection failed, use force_reconnect()");
            }
            ConnectionStatus::Disconnected => {
                self.auto_reconnect = true;
                if self.retry_timer.take().is_some() {
                    debug!("connect() cancelled pending backoff timer");
                }
                self.start_attempt();
            }
        }
    }

    fn start_attempt(&mut self) {
        let url = self.config.core.url.clone();
        let timeout = self.config.connect_timeout();

        debug!(
            "Connecting to {} (attempt {}/{})",
            url,
            self.policy.attempt(),
            self.policy.max_attempts()
        );

        self.pending_connect = Some(Box::pin(open_link(url, timeout)));
        self.set_status(ConnectionStatus::Connecting);
    }

    fn handle_opened(&mut self, result: Result<WsLink, BridgeError>) {
        match result {
            Ok(stream) => {
                // A write stuck for a whole liveness window means the core stopped reading.
                self.link = Some(Link::spawn(
                    stream,
                    Arc::clone(&self.stats),
                    self.config.liveness_timeout(),
                ));
                self.policy.reset();
                self.monitor.reset(Instant::now());
                self.snapshot.attempt = 0;
                self.snapshot.last_liveness = Some(SystemTime::now());
                self.set_status(ConnectionStatus::Connected);
                info!("Connected to {}", self.config.core.url);
                self.flush_queue();
            }
            Err(e) => {
                self.stats.record_connect_failure();
                warn!("Connect to {} failed: {}", self.config.core.url, e);
                self.schedule_retry();
            }
        }
    }

    fn send(&mut self, envelope: Envelope) {
        if self.snapshot.status != ConnectionStatus::Connected || self.link.is_none() {
            trace!(
                "Queueing {} envelope {} while {}",
                envelope.kind(),
                envelope.id,
                self.snapshot.status
            );
            let evicted = self.queue.enqueue(envelope);
            self.stats.record_evicted(evicted);
            return;
        }

        if let Err(envelope) = self.submit(envelope) {
            debug!("Link writer stopped, requeueing envelope {}", envelope.id);
            self.requeue(vec![envelope]);
        }
    }

    /// Hand the whole queue to the link writer in order.
    fn flush_queue(&mut self) {
        let pending = self.queue.drain();
        if pending.is_empty() {
            return;
        }

        info!("Flushing {} queued envelope(s)", pending.len());

        let mut remaining = pending.into_iter();
        while let Some(envelope) = remaining.next() {
            if let Err(envelope) = self.submit(envelope) {
                let mut unsent = vec![envelope];
                unsent.extend(remaining);
                warn!("Flush interrupted, {} envelope(s) requeued", unsent.len());
                self.requeue(unsent);
                return;
            }
        }
    }

    /// Encode and hand one envelope to the writer. Encoding failures drop the
    /// envelope and are not transport errors. Gives the envelope back if there
    /// is no writer to take it.
    fn submit(&self, envelope: Envelope) -> Result<(), Envelope> {
        let text = match protocol::encode(&envelope) {
            Ok(text) => text,
            Err(e) => {
                error!(
                    "Dropping unencodable {} envelope {}: {}",
                    envelope.kind(),
                    envelope.id,
                    e
                );
                return Ok(());
            }
        };

        let Some(link) = self.link.as_ref() else {
            return Err(envelope);
        };

        match link.submit(Outgoing::Envelope { envelope, text }) {
            Ok(()) => Ok(()),
            Err(Outgoing::Envelope { envelope, .. }) => Err(envelope),
            Err(_) => Ok(()),
        }
    }

    /// Put envelopes the link never wrote back at the front of the queue.
    fn requeue(&mut self, unsent: Vec<Envelope>) {
        if unsent.is_empty() {
            return;
        }
        let evicted = self.queue.restore_front(unsent);
        self.stats.record_evicted(evicted);
    }

    async fn handle_frame(&mut self, frame: Option<Result<Message, WsError>>) {
        match frame {
            Some(Ok(Message::Text(text))) => {
                self.observe_traffic();
                self.handle_inbound(text.as_str());
            }
            Some(Ok(Message::Binary(bytes))) => {
                self.observe_traffic();
                match std::str::from_utf8(&bytes) {
                    Ok(text) => self.handle_inbound(text),
                    Err(e) => {
                        self.stats.record_malformed();
                        warn!("Dropping binary frame that is not UTF-8: {}", e);
                    }
                }
            }
            Some(Ok(Message::Ping(_))) => {
                self.observe_traffic();
                // The pong is queued by the protocol layer; flushing sends it.
                if let Some(link) = self.link.as_ref() {
                    let _ = link.submit(Outgoing::Flush);
                }
            }
            Some(Ok(Message::Pong(_))) => self.observe_traffic(),
            Some(Ok(Message::Close(frame))) => {
                let reason = frame
                    .map(|f| format!("closed by core ({} {})", u16::from(f.code), f.reason.as_str()))
                    .unwrap_or_else(|| String::from("closed by core"));
                self.handle_link_lost(&reason).await;
            }
            Some(Ok(Message::Frame(_))) => {}
            Some(Err(e)) => {
                let error = BridgeError::Read {
                    message: e.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                };
                self.handle_link_lost(&error.to_string()).await;
            }
            None => self.handle_link_lost("stream ended").await,
        }
    }

    fn handle_inbound(&mut self, text: &str) {
        match protocol::decode(text, Origin::Core) {
            Ok(Decoded::Envelope(envelope)) => {
                self.stats.record_received();
                trace!("Received {} envelope {}", envelope.kind(), envelope.id);
                self.message_subscribers.emit(&envelope);
            }
            Ok(Decoded::Unknown { kind, id }) => {
                self.stats.record_ignored();
                debug!("Ignoring envelope of unknown kind {:?} (id {:?})", kind, id);
            }
            Err(e) => {
                self.stats.record_malformed();
                warn!("Dropping malformed envelope: {}", e);
            }
        }
    }

    async fn handle_tick(&mut self) {
        if self.snapshot.status != ConnectionStatus::Connected || self.link.is_none() {
            return;
        }

        let now = Instant::now();
        if self.monitor.is_expired(now) {
            self.stats.record_liveness_timeout();
            warn!(
                "No traffic from {} for {:?} (timeout {:?})",
                self.config.core.url,
                self.monitor.silence(now),
                self.monitor.timeout()
            );
            self.handle_link_lost("liveness timeout").await;
            return;
        }

        if self.monitor.heartbeat_due(now) {
            // Heartbeats are never queued.
            let heartbeat = Envelope::client(Payload::heartbeat());
            match protocol::encode(&heartbeat) {
                Ok(text) => {
                    if let Some(link) = self.link.as_ref() {
                        let _ = link.submit(Outgoing::Heartbeat(text));
                    }
                }
                Err(e) => error!("Failed to encode heartbeat: {}", e),
            }
        }
    }

    fn observe_traffic(&mut self) {
        self.monitor.observe(Instant::now());
        let now = SystemTime::now();
        self.snapshot.last_liveness = Some(now);
        self.status_tx.send_modify(|snapshot| snapshot.last_liveness = Some(now));
    }

    /// The writer gave up: the link is unusable even if reads still work.
    fn handle_writer_stopped(&mut self, exit: Result<WriterExit, JoinError>) {
        // The writer has already finished, so the link is dropped, not closed.
        self.link = None;

        let reason = match exit {
            Ok(exit) => {
                let reason = exit
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| String::from("writer stopped"));
                if !exit.unsent.is_empty() {
                    warn!("Requeueing {} unwritten envelope(s)", exit.unsent.len());
                }
                self.requeue(exit.unsent);
                reason
            }
            Err(e) => format!("writer task failed: {e}"),
        };

        warn!("Link to {} lost: {}", self.config.core.url, reason);
        self.schedule_retry();
    }

    async fn handle_link_lost(&mut self, reason: &str) {
        if self.link.is_none() {
            return;
        }
        warn!("Link to {} lost: {}", self.config.core.url, reason);
        // Publish the loss first; the close handshake may take up to CLOSE_TIMEOUT.
        let link = self.link.take();
        self.schedule_retry();
        if let Some(link) = link {
            let unsent = link.close(CLOSE_TIMEOUT).await;
            self.requeue(unsent);
        }
    }

    fn schedule_retry(&mut self) {
        if !self.auto_reconnect {
            self.set_status(ConnectionStatus::Disconnected);
            return;
        }

        match self.policy.next_delay() {
            Some(delay) => {
                self.snapshot.attempt = self.policy.attempt();
                info!(
                    "Reconnecting to {} in {:?} (attempt {}/{})",
                    self.config.core.url,
                    delay,
                    self.policy.attempt(),
                    self.policy.max_attempts()
                );
                self.retry_timer = Some(Box::pin(sleep(delay)));
                self.set_status(ConnectionStatus::Disconnected);
            }
            None => {
                error!(
                    "Connection to {} failed after {} reconnect attempts",
                    self.config.core.url,
                    self.policy.max_attempts()
                );
                self.queue.report_evictions();
                self.set_status(ConnectionStatus::Failed);
            }
        }
    }

    fn cancel_pending(&mut self) {
        self.pending_connect = None;
        self.retry_timer = None;
    }

    async fn close_link(&mut self) {
        if let Some(link) = self.link.take() {
            let unsent = link.close(CLOSE_TIMEOUT).await;
            if !unsent.is_empty() {
                debug!("Requeueing {} unwritten envelope(s)", unsent.len());
            }
            self.requeue(unsent);
        }
    }

    async fn teardown(&mut self) {
        self.auto_reconnect = false;
        self.cancel_pending();
        self.close_link().await;
        self.queue.report_evictions();
        if !self.queue.is_empty() {
            warn!(
                "Discarding {} undelivered envelope(s) on shutdown",
                self.queue.len()
            );
        }
        self.set_status(ConnectionStatus::Disconnected);
    }

    /// Publish a status change. Subscribers only hear about changes in status
    /// or attempt count.
    fn set_status(&mut self, status: ConnectionStatus) {
        let previous = *self.status_tx.borrow();
        self.snapshot.status = status;
        self.status_tx.send_replace(self.snapshot);

        if previous.status != status || previous.attempt != self.snapshot.attempt {
            debug!("Connection status {} -> {}", previous.status, status);
            self.status_subscribers.emit(&self.snapshot);
        }
    }
}

async fn open_link(url: String, timeout: Duration) -> Result<WsLink, BridgeError> {
    match tokio::time::timeout(timeout, connect_async(url.as_str())).await {
        Ok(Ok((link, _response))) => Ok(link),
        Ok(Err(e)) => Err(BridgeError::Connect {
            message: format!("{url}: {e}"),
            location: ErrorLocation::from(Location::caller()),
        }),
        Err(_) => Err(BridgeError::Timeout {
            message: format!("{url}: no response within {timeout:?}"),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

async fn poll_optional<F>(slot: &mut Option<F>) -> F::Output
where
    F: Future + Unpin,
{
    match slot.as_mut() {
        Some(future) => future.await,
        None => pending().await,
    }
}
