use crate::bridge::liveness::LivenessMonitor;

use std::time::{Duration, Instant};

/// **VALUE**: Verifies the timeout is strictly greater-than.
///
/// **BUG THIS CATCHES**: Would catch closing a link that is exactly at the limit, or never
/// closing a silent one.
#[test]
fn given_silence_when_checking_then_expires_only_past_timeout() {
    // GIVEN: 10s heartbeats with a 30s timeout
    let start = Instant::now();
    let mut monitor = LivenessMonitor::new(Duration::from_secs(10), Duration::from_secs(30));
    monitor.reset(start);

    // WHEN/THEN: At the limit it is alive, past it expired
    assert!(!monitor.is_expired(start + Duration::from_secs(30)));
    assert!(monitor.is_expired(start + Duration::from_millis(30_001)));
}

/// **VALUE**: Verifies inbound traffic pushes the deadline out.
#[test]
fn given_traffic_when_observed_then_silence_restarts() {
    let start = Instant::now();
    let mut monitor = LivenessMonitor::new(Duration::from_secs(10), Duration::from_secs(30));
    monitor.reset(start);

    monitor.observe(start + Duration::from_secs(25));

    assert!(!monitor.is_expired(start + Duration::from_secs(50)));
    assert_eq!(
        monitor.silence(start + Duration::from_secs(50)),
        Duration::from_secs(25)
    );
}

/// **VALUE**: Verifies a heartbeat is due once per full interval.
///
/// **BUG THIS CATCHES**: Would catch a heartbeat on every monitoring tick.
#[test]
fn given_interval_when_ticking_then_heartbeat_due_once_per_interval() {
    let start = Instant::now();
    let mut monitor = LivenessMonitor::new(Duration::from_secs(10), Duration::from_secs(30));
    monitor.reset(start);

    assert!(!monitor.heartbeat_due(start + Duration::from_secs(9)));
    assert!(monitor.heartbeat_due(start + Duration::from_secs(10)));
    assert!(!monitor.heartbeat_due(start + Duration::from_secs(11)));
    assert!(monitor.heartbeat_due(start + Duration::from_secs(20)));
}
