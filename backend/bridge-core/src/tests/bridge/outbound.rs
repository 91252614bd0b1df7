use crate::bridge::outbound::OutboundQueue;

use models::{Envelope, Payload, UserInput};

fn input(text: &str) -> Envelope {
    Envelope::client(Payload::UserInput(UserInput {
        text: text.to_string(),
        session_id: None,
    }))
}

fn texts(envelopes: &[Envelope]) -> Vec<String> {
    envelopes
        .iter()
        .map(|envelope| match &envelope.payload {
            Payload::UserInput(input) => input.text.clone(),
            other => panic!("unexpected payload {other:?}"),
        })
        .collect()
}

/// **VALUE**: Verifies drain returns envelopes in insertion order and empties the queue.
///
/// **BUG THIS CATCHES**: Would catch LIFO draining or a drain that leaves entries behind
/// (which would be sent twice on the next reconnect).
#[test]
fn given_three_envelopes_when_drained_then_returned_in_fifo_order() {
    // GIVEN: Three queued envelopes
    let mut queue = OutboundQueue::new(8);
    for text in ["a", "b", "c"] {
        queue.enqueue(input(text));
    }

    // WHEN: Draining
    let drained = queue.drain();

    // THEN: FIFO order and empty queue
    assert_eq!(texts(&drained), ["a", "b", "c"]);
    assert!(queue.is_empty());
    assert!(queue.drain().is_empty());
}

/// **VALUE**: Verifies oldest-first eviction at capacity.
///
/// **WHY THIS MATTERS**: During a long outage the newest commands are the relevant ones.
///
/// **BUG THIS CATCHES**: Would catch eviction of the newest entry or unbounded growth.
#[test]
fn given_full_queue_when_enqueuing_then_oldest_entries_are_evicted() {
    // GIVEN: A queue of capacity 2
    let mut queue = OutboundQueue::new(2);

    // WHEN: Enqueuing four envelopes
    let evicted: usize = ["a", "b", "c", "d"]
        .into_iter()
        .map(|text| queue.enqueue(input(text)))
        .sum();

    // THEN: Only the two newest survive
    assert_eq!(evicted, 2);
    assert_eq!(queue.evicted_total(), 2);
    assert_eq!(texts(&queue.drain()), ["c", "d"]);
}

/// **VALUE**: Verifies an interrupted flush is restored ahead of newer entries.
///
/// **WHY THIS MATTERS**: A second disconnect mid-flush must not reorder or lose commands.
///
/// **BUG THIS CATCHES**: Would catch restoring at the back or reversing the unsent tail.
#[test]
fn given_unsent_tail_when_restored_then_precedes_newer_entries_in_order() {
    // GIVEN: A drained batch and a newer envelope queued afterwards
    let mut queue = OutboundQueue::new(8);
    for text in ["a", "b", "c"] {
        queue.enqueue(input(text));
    }
    let mut batch = queue.drain();
    queue.enqueue(input("d"));

    // WHEN: The first envelope was sent and the rest are restored
    let unsent = batch.split_off(1);
    let evicted = queue.restore_front(unsent);

    // THEN: b, c precede d
    assert_eq!(evicted, 0);
    assert_eq!(texts(&queue.drain()), ["b", "c", "d"]);
}
