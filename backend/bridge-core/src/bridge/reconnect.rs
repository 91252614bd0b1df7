use crate::config::bridge::ReconnectSection;

use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};

/// Attempt counter plus exponential backoff.
///
/// Each failed attempt takes the next delay; a successful connect resets both.
/// Once `max_attempts` delays have been handed out the policy is exhausted.
pub struct ReconnectPolicy {
    backoff: ExponentialBackoff,
    attempt: u32,
    max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(section: &ReconnectSection) -> Self {
        let base = Duration::from_millis(section.base_delay_ms);
        let mut backoff = ExponentialBackoff {
            current_interval: base,
            initial_interval: base,
            randomization_factor: section.jitter,
            multiplier: section.multiplier,
            max_interval: Duration::from_millis(section.max_delay_ms),
            max_elapsed_time: None,
            ..Default::default()
        };
        backoff.reset();

        Self {
            backoff,
            attempt: 0,
            max_attempts: section.max_attempts,
        }
    }

    /// Consecutive failed attempts since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Delay before the next attempt, or `None` once the ceiling is reached.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.exhausted() {
            return None;
        }
        self.attempt += 1;
        self.backoff.next_backoff()
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
        self.backoff.reset();
    }
}
