use models::Envelope;

use std::collections::VecDeque;

use log::warn;

/// FIFO of envelopes waiting for a connected link.
///
/// Over capacity the oldest entries are evicted. Evictions are counted and
/// reported as one warning when the queue is next drained.
#[derive(Debug)]
pub struct OutboundQueue {
    entries: VecDeque<Envelope>,
    capacity: usize,
    evicted_since_warning: u64,
    evicted_total: u64,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            evicted_since_warning: 0,
            evicted_total: 0,
        }
    }

    /// Append, evicting the oldest entry when full. Returns the number evicted.
    pub fn enqueue(&mut self, envelope: Envelope) -> usize {
        let mut evicted = 0;
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
            evicted += 1;
        }
        self.entries.push_back(envelope);
        self.evicted_since_warning += evicted as u64;
        self.evicted_total += evicted as u64;
        evicted
    }

    /// Take every queued envelope in insertion order.
    pub fn drain(&mut self) -> Vec<Envelope> {
        self.report_evictions();
        self.entries.drain(..).collect()
    }

    /// Put unsent envelopes back at the front, keeping their order.
    ///
    /// Restored entries may push the queue over capacity; the overflow is
    /// evicted from the oldest end like any other. Returns the number evicted.
    pub fn restore_front(&mut self, unsent: Vec<Envelope>) -> usize {
        for envelope in unsent.into_iter().rev() {
            self.entries.push_front(envelope);
        }
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            evicted += 1;
        }
        self.evicted_since_warning += evicted as u64;
        self.evicted_total += evicted as u64;
        evicted
    }

    /// Emit the aggregated eviction warning, if anything was evicted.
    pub fn report_evictions(&mut self) {
        if self.evicted_since_warning > 0 {
            warn!(
                "Outbound queue full (capacity {}): dropped {} oldest envelope(s) while disconnected",
                self.capacity, self.evicted_since_warning
            );
            self.evicted_since_warning = 0;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }
}
