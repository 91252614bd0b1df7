use std::time::{Duration, Instant};

/// Tracks inbound traffic and heartbeat cadence for one connected link.
#[derive(Debug)]
pub struct LivenessMonitor {
    heartbeat_interval: Duration,
    timeout: Duration,
    last_inbound: Instant,
    last_heartbeat: Instant,
}

impl LivenessMonitor {
    pub fn new(heartbeat_interval: Duration, timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            heartbeat_interval,
            timeout,
            last_inbound: now,
            last_heartbeat: now,
        }
    }

    /// Restart both clocks, used when a link opens.
    pub fn reset(&mut self, now: Instant) {
        self.last_inbound = now;
        self.last_heartbeat = now;
    }

    /// Record inbound traffic of any kind.
    pub fn observe(&mut self, now: Instant) {
        self.last_inbound = now;
    }

    pub fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_inbound)
    }

    /// Silence strictly longer than the timeout.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.silence(now) > self.timeout
    }

    /// Whether a full interval has passed since the last heartbeat. Marks the
    /// heartbeat as sent when it returns `true`.
    pub fn heartbeat_due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_heartbeat) >= self.heartbeat_interval {
            self.last_heartbeat = now;
            true
        } else {
            false
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
