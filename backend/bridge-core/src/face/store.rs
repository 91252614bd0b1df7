//! Face state actor.
//!
//! The [`FaceMachine`] lives on its own task. Events arrive over an unbounded
//! mpsc (so dispatching from a channel subscriber never blocks) and each change
//! is published as a whole [`FaceSnapshot`] through a `watch`, so readers never
//! see a phase paired with another phase's parameters.

use crate::error::face::FaceError;
use crate::face::machine::{FaceMachine, FaceTransition};
use crate::face::transition::FaceEvent;
use crate::pubsub::{Subscribers, SubscriptionId};

use common::ErrorLocation;
use models::{FaceSnapshot, ParameterOverrides, Phase};

use std::panic::Location;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot, watch};

#[derive(Debug)]
enum FaceCommand {
    Dispatch(FaceEvent),
    SetOverrides(
        ParameterOverrides,
        oneshot::Sender<Result<FaceSnapshot, FaceError>>,
    ),
    ClearOverrides(oneshot::Sender<FaceSnapshot>),
}

/// Handle to the face actor. Clones share the same state.
#[derive(Clone)]
pub struct FaceStore {
    command_tx: mpsc::UnboundedSender<FaceCommand>,
    snapshot_rx: watch::Receiver<FaceSnapshot>,
    transitions: Arc<Subscribers<FaceTransition>>,
}

impl FaceStore {
    /// Spawn the actor with the overrides from persisted settings.
    ///
    /// Invalid overrides are logged and ignored. Must be called from within a
    /// tokio runtime.
    pub fn spawn(overrides: ParameterOverrides) -> Self {
        let overrides = match overrides.validate() {
            Ok(()) => overrides,
            Err(e) => {
                warn!("Ignoring configured face overrides: {}", e);
                ParameterOverrides::default()
            }
        };

        let machine = FaceMachine::new(overrides);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());
        let transitions = Arc::new(Subscribers::new());

        tokio::spawn(face_actor(
            command_rx,
            machine,
            snapshot_tx,
            Arc::clone(&transitions),
        ));

        Self {
            command_tx,
            snapshot_rx,
            transitions,
        }
    }

    /// Queue an event. Never blocks.
    pub fn dispatch(&self, event: FaceEvent) {
        if self.command_tx.send(FaceCommand::Dispatch(event)).is_err() {
            debug!("Face store stopped, dropping {:?}", event);
        }
    }

    pub fn reset(&self) {
        self.dispatch(FaceEvent::Reset);
    }

    pub fn sleep(&self) {
        self.dispatch(FaceEvent::Sleep);
    }

    pub async fn set_overrides(
        &self,
        overrides: ParameterOverrides,
    ) -> Result<FaceSnapshot, FaceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(FaceCommand::SetOverrides(overrides, reply_tx))
            .map_err(|_| stopped())?;
        reply_rx.await.map_err(|_| stopped())?
    }

    pub async fn clear_overrides(&self) -> Result<FaceSnapshot, FaceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(FaceCommand::ClearOverrides(reply_tx))
            .map_err(|_| stopped())?;
        reply_rx.await.map_err(|_| stopped())
    }

    /// Latest consistent snapshot.
    pub fn snapshot(&self) -> FaceSnapshot {
        *self.snapshot_rx.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<FaceSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Wait until the face reaches `phase`. Returns `false` on timeout.
    pub async fn wait_for_phase(&self, phase: Phase, timeout: Duration) -> bool {
        let mut snapshot_rx = self.snapshot_rx.clone();
        let reached = tokio::time::timeout(timeout, async move {
            snapshot_rx
                .wait_for(|snapshot| snapshot.phase == phase)
                .await
                .is_ok()
        })
        .await;

        matches!(reached, Ok(true))
    }

    /// Subscribe to changes. Handlers run on the face task in change order.
    pub fn on_transition<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&FaceTransition) + Send + Sync + 'static,
    {
        self.transitions.subscribe(handler)
    }

    pub fn unsubscribe_transition(&self, id: SubscriptionId) -> bool {
        self.transitions.unsubscribe(id)
    }
}

#[track_caller]
fn stopped() -> FaceError {
    FaceError::Stopped {
        message: String::from("Face store actor is not running"),
        location: ErrorLocation::from(Location::caller()),
    }
}

async fn face_actor(
    mut command_rx: mpsc::UnboundedReceiver<FaceCommand>,
    mut machine: FaceMachine,
    snapshot_tx: watch::Sender<FaceSnapshot>,
    transitions: Arc<Subscribers<FaceTransition>>,
) {
    info!("Face store actor started");

    while let Some(command) = command_rx.recv().await {
        match command {
            FaceCommand::Dispatch(event) => {
                if let Some(change) = machine.apply(event, SystemTime::now()) {
                    publish(&snapshot_tx, &transitions, &change);
                }
            }
            FaceCommand::SetOverrides(overrides, reply) => {
                let result = machine
                    .set_overrides(overrides)
                    .map(|change| {
                        publish(&snapshot_tx, &transitions, &change);
                        change.snapshot
                    })
                    .map_err(FaceError::from);
                let _ = reply.send(result);
            }
            FaceCommand::ClearOverrides(reply) => {
                let change = machine.clear_overrides();
                publish(&snapshot_tx, &transitions, &change);
                let _ = reply.send(change.snapshot);
            }
        }
    }

    debug!("Face store actor stopped");
}

fn publish(
    snapshot_tx: &watch::Sender<FaceSnapshot>,
    transitions: &Subscribers<FaceTransition>,
    change: &FaceTransition,
) {
    snapshot_tx.send_replace(change.snapshot);
    transitions.emit(change);
}
