use crate::bridge::reconnect::ReconnectPolicy;
use crate::config::bridge::ReconnectSection;

use std::time::Duration;

fn assert_close(actual: Duration, expected_ms: f64) {
    let actual_ms = actual.as_secs_f64() * 1000.0;
    assert!(
        (actual_ms - expected_ms).abs() <= 1.0,
        "expected ~{expected_ms}ms, got {actual_ms}ms"
    );
}

/// **VALUE**: Verifies the documented backoff sequence for five failures.
///
/// **WHY THIS MATTERS**: Reconnect pacing decides how fast the face recovers after a core
/// restart and how hard a dead core gets hammered.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The multiplier or base delay is not wired through
/// - Jitter is applied even when configured to zero
/// - The first delay is skipped or doubled
#[test]
fn given_base_3000_and_multiplier_1_5_when_five_attempts_fail_then_delays_match_sequence() {
    // GIVEN: Default reconnect settings (3000ms base, x1.5, no jitter)
    let mut policy = ReconnectPolicy::new(&ReconnectSection::default());

    // WHEN: Taking five delays
    let delays: Vec<Duration> = (0..5).filter_map(|_| policy.next_delay()).collect();

    // THEN: Delays follow 3000, 4500, 6750, 10125, 15187.5 ms
    assert_eq!(delays.len(), 5);
    for (delay, expected) in delays.iter().zip([3000.0, 4500.0, 6750.0, 10125.0, 15187.5]) {
        assert_close(*delay, expected);
    }
    assert_eq!(policy.attempt(), 5);
}

/// **VALUE**: Verifies delays never decrease and respect the maximum.
///
/// **BUG THIS CATCHES**: Would catch an overflow or a cap that wraps back to the base.
#[test]
fn given_low_max_delay_when_many_attempts_then_delays_are_non_decreasing_and_capped() {
    // GIVEN: A policy capped at 10 seconds
    let section = ReconnectSection {
        max_attempts: 12,
        max_delay_ms: 10_000,
        ..ReconnectSection::default()
    };
    let mut policy = ReconnectPolicy::new(&section);

    // WHEN: Taking every delay
    let delays: Vec<Duration> = std::iter::from_fn(|| policy.next_delay()).collect();

    // THEN: Monotonic and capped
    assert_eq!(delays.len(), 12);
    assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(delays.iter().all(|d| *d <= Duration::from_millis(10_001)));
}

/// **VALUE**: Verifies the attempt ceiling and the reset after success.
///
/// **WHY THIS MATTERS**: At the ceiling the channel must stop and report `failed`;
/// after a successful connect the next outage must start from the base delay again.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The ceiling is off by one
/// - `reset()` clears the counter but not the backoff interval
#[test]
fn given_exhausted_policy_when_reset_then_starts_again_from_base_delay() {
    // GIVEN: A policy allowing two attempts
    let section = ReconnectSection {
        max_attempts: 2,
        ..ReconnectSection::default()
    };
    let mut policy = ReconnectPolicy::new(&section);

    // WHEN: Exhausting it
    assert!(policy.next_delay().is_some());
    assert!(policy.next_delay().is_some());

    // THEN: No more delays
    assert!(policy.exhausted());
    assert_eq!(policy.next_delay(), None);

    // WHEN: Resetting after a successful connect
    policy.reset();

    // THEN: Counter and delay start over
    assert_eq!(policy.attempt(), 0);
    let first = policy.next_delay().expect("delay after reset");
    assert_close(first, 3000.0);
}
