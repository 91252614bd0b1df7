use crate::protocol;

use models::{Envelope, Payload, SystemStatus};

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{error, info};
use tokio::sync::{Notify, mpsc};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_tungstenite::tungstenite::Message;

pub(crate) struct ClientEntry {
    pub(crate) tx: mpsc::UnboundedSender<Message>,
    pub(crate) reader: AbortHandle,
    pub(crate) writer: AbortHandle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointStatsSnapshot {
    pub sent: u64,
    pub received: u64,
    pub errors: u64,
}

/// State shared by the accept loop, client tasks and handles.
pub(crate) struct EndpointShared {
    clients: Mutex<HashMap<u64, ClientEntry>>,
    next_client: AtomicU64,
    received: Mutex<Vec<Envelope>>,
    received_notify: Notify,
    greeting: Mutex<SystemStatus>,
    silent: AtomicBool,
    sent_count: AtomicU64,
    received_count: AtomicU64,
    error_count: AtomicU64,
}

impl EndpointShared {
    pub(crate) fn new(greeting: SystemStatus) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_client: AtomicU64::new(1),
            received: Mutex::new(Vec::new()),
            received_notify: Notify::new(),
            greeting: Mutex::new(greeting),
            silent: AtomicBool::new(false),
            sent_count: AtomicU64::new(0),
            received_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
        }
    }

    pub(crate) fn next_client_id(&self) -> u64 {
        self.next_client.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn register(&self, client_id: u64, entry: ClientEntry) {
        lock(&self.clients).insert(client_id, entry);
    }

    pub(crate) fn remove(&self, client_id: u64) {
        if let Some(entry) = lock(&self.clients).remove(&client_id) {
            entry.writer.abort();
        }
    }

    pub(crate) fn is_silent(&self) -> bool {
        self.silent.load(Ordering::SeqCst)
    }

    pub(crate) fn greeting(&self) -> SystemStatus {
        *lock(&self.greeting)
    }

    pub(crate) fn record_received(&self, envelope: Envelope) {
        self.received_count.fetch_add(1, Ordering::Relaxed);
        lock(&self.received).push(envelope);
        self.received_notify.notify_waiters();
    }

    pub(crate) fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn send_to(&self, client_id: u64, envelope: &Envelope) -> bool {
        let Some(text) = encode(envelope) else {
            return false;
        };
        let clients = lock(&self.clients);
        match clients.get(&client_id) {
            Some(entry) if entry.tx.send(Message::Text(text.into())).is_ok() => {
                self.sent_count.fetch_add(1, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }

    /// Returns the number of clients the envelope was queued for.
    pub(crate) fn broadcast(&self, envelope: &Envelope) -> usize {
        match encode(envelope) {
            Some(text) => self.broadcast_text(&text),
            None => 0,
        }
    }

    pub(crate) fn broadcast_text(&self, text: &str) -> usize {
        let clients = lock(&self.clients);
        let mut delivered = 0;
        for entry in clients.values() {
            if entry.tx.send(Message::Text(text.to_owned().into())).is_ok() {
                delivered += 1;
            }
        }
        self.sent_count
            .fetch_add(delivered as u64, Ordering::Relaxed);
        delivered
    }

    fn drop_clients(&self) -> usize {
        let dropped: Vec<ClientEntry> = lock(&self.clients).drain().map(|(_, entry)| entry).collect();
        for entry in &dropped {
            entry.reader.abort();
            entry.writer.abort();
        }
        dropped.len()
    }
}

fn encode(envelope: &Envelope) -> Option<String> {
    match protocol::encode(envelope) {
        Ok(text) => Some(text),
        Err(e) => {
            error!("Core endpoint failed to encode {}: {}", envelope.kind(), e);
            None
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a running core endpoint.
///
/// Dropping the handle does not stop the endpoint; call
/// [`CoreEndpointHandle::shutdown`].
#[derive(Clone)]
pub struct CoreEndpointHandle {
    addr: SocketAddr,
    shared: Arc<EndpointShared>,
    accept_task: AbortHandle,
    heartbeat_task: Option<AbortHandle>,
}

impl CoreEndpointHandle {
    pub(crate) fn new(
        addr: SocketAddr,
        shared: Arc<EndpointShared>,
        accept_task: JoinHandle<()>,
        heartbeat_task: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            addr,
            shared,
            accept_task: accept_task.abort_handle(),
            heartbeat_task: heartbeat_task.map(|task| task.abort_handle()),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `ws://` URL clients should connect to.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Send a core payload to every connected client.
    pub fn broadcast(&self, payload: Payload) -> usize {
        self.shared.broadcast(&Envelope::core(payload))
    }

    /// Send a raw text frame to every client, bypassing the codec.
    pub fn broadcast_raw(&self, text: &str) -> usize {
        self.shared.broadcast_text(text)
    }

    /// Change the `system_status` sent to clients that connect later.
    pub fn set_greeting(&self, status: SystemStatus) {
        *lock(&self.shared.greeting) = status;
    }

    /// A silent endpoint sends nothing on its own: no greeting, no heartbeat
    /// replies, no periodic heartbeats.
    pub fn set_silent(&self, silent: bool) {
        self.shared.silent.store(silent, Ordering::SeqCst);
    }

    /// Abruptly drop every client connection. Returns how many were dropped.
    pub fn drop_clients(&self) -> usize {
        let dropped = self.shared.drop_clients();
        info!("Core endpoint dropped {} client(s)", dropped);
        dropped
    }

    pub fn client_count(&self) -> usize {
        lock(&self.shared.clients).len()
    }

    /// Wait until at least `count` clients are connected.
    pub async fn wait_for_clients(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.client_count() < count {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    /// Every envelope received so far, heartbeats included, in arrival order.
    pub fn all_received(&self) -> Vec<Envelope> {
        lock(&self.shared.received).clone()
    }

    /// Received envelopes excluding heartbeats, in arrival order.
    pub fn received(&self) -> Vec<Envelope> {
        lock(&self.shared.received)
            .iter()
            .filter(|envelope| !matches!(envelope.payload, Payload::Heartbeat(_)))
            .cloned()
            .collect()
    }

    pub fn heartbeats_received(&self) -> usize {
        lock(&self.shared.received)
            .iter()
            .filter(|envelope| matches!(envelope.payload, Payload::Heartbeat(_)))
            .count()
    }

    /// Wait until at least `count` non-heartbeat envelopes have arrived, then
    /// return them. Returns whatever arrived if the timeout passes first.
    pub async fn wait_for_received(&self, count: usize, timeout: Duration) -> Vec<Envelope> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.shared.received_notify.notified();
            let received = self.received();
            if received.len() >= count {
                return received;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.received();
            }
        }
    }

    pub fn stats(&self) -> EndpointStatsSnapshot {
        EndpointStatsSnapshot {
            sent: self.shared.sent_count.load(Ordering::Relaxed),
            received: self.shared.received_count.load(Ordering::Relaxed),
            errors: self.shared.error_count.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting, stop the heartbeat task and drop every client.
    pub fn shutdown(&self) {
        self.accept_task.abort();
        if let Some(task) = &self.heartbeat_task {
            task.abort();
        }
        self.shared.drop_clients();
        info!("Core endpoint on {} shut down", self.addr);
    }
}
