use crate::bridge::BridgeChannel;
use crate::face::store::FaceStore;
use crate::face::transition::{event_for_connection, event_for_envelope};
use crate::pubsub::SubscriptionId;

use models::{FaceStateChange, Payload};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use log::debug;

/// Subscriptions wiring a channel into a face store.
///
/// Dropping the link detaches it.
pub struct FaceLink {
    channel: BridgeChannel,
    face: FaceStore,
    message_subscription: SubscriptionId,
    status_subscription: SubscriptionId,
    echo_subscription: Option<SubscriptionId>,
    detached: AtomicBool,
}

/// Feed inbound envelopes and connection changes into `face`.
///
/// With `echo` set, every phase or expression change is sent back to the core
/// as `face_state_change`.
pub fn attach_face(channel: &BridgeChannel, face: &FaceStore, echo: bool) -> FaceLink {
    let message_face = face.clone();
    let message_subscription = channel.on_message(move |envelope| {
        if let Some(event) = event_for_envelope(envelope) {
            message_face.dispatch(event);
        }
    });

    let status_face = face.clone();
    let previous = Mutex::new(channel.status().status);
    let status_subscription = channel.on_status_change(move |snapshot| {
        let mut previous = previous.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(event) = event_for_connection(*previous, snapshot.status) {
            status_face.dispatch(event);
        }
        *previous = snapshot.status;
    });

    let echo_subscription = echo.then(|| {
        let echo_channel = channel.clone();
        face.on_transition(move |change| {
            // Override-only changes are not state changes for the core.
            if change.event.is_none() {
                return;
            }
            echo_channel.send(Payload::FaceStateChange(FaceStateChange {
                state: change.snapshot.phase,
                expression: change.snapshot.expression,
            }));
        })
    });

    debug!("Face attached to {} (echo: {})", channel.endpoint(), echo);

    FaceLink {
        channel: channel.clone(),
        face: face.clone(),
        message_subscription,
        status_subscription,
        echo_subscription,
        detached: AtomicBool::new(false),
    }
}

impl FaceLink {
    /// Remove every subscription. Safe to call more than once.
    pub fn detach(&self) {
        if self.detached.swap(true, Ordering::SeqCst) {
            return;
        }

        self.channel.unsubscribe_message(self.message_subscription);
        self.channel.unsubscribe_status(self.status_subscription);
        if let Some(id) = self.echo_subscription {
            self.face.unsubscribe_transition(id);
        }
        debug!("Face detached from {}", self.channel.endpoint());
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }
}

impl Drop for FaceLink {
    fn drop(&mut self) {
        self.detach();
    }
}
