use std::sync::atomic::{AtomicU64, Ordering};

/// Channel counters, shared between the actor and its handles.
#[derive(Debug, Default)]
pub struct ChannelStats {
    sent: AtomicU64,
    received: AtomicU64,
    ignored: AtomicU64,
    malformed: AtomicU64,
    evicted: AtomicU64,
    connect_failures: AtomicU64,
    liveness_timeouts: AtomicU64,
    write_stalls: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub sent: u64,
    pub received: u64,
    /// Well-formed frames with an unknown kind.
    pub ignored: u64,
    pub malformed: u64,
    pub evicted: u64,
    pub connect_failures: u64,
    pub liveness_timeouts: u64,
    /// Links dropped because a single write made no progress.
    pub write_stalls: u64,
}

impl ChannelStats {
    pub(crate) fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self, count: usize) {
        self.evicted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_liveness_timeout(&self) {
        self.liveness_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write_stall(&self) {
        self.write_stalls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            liveness_timeouts: self.liveness_timeouts.load(Ordering::Relaxed),
            write_stalls: self.write_stalls.load(Ordering::Relaxed),
        }
    }
}
