use crate::face::transition::{FaceEvent, transition};

use models::{Expression, FaceSnapshot, ModelError, ParameterOverrides, Phase};

use std::time::SystemTime;

use log::{debug, info};

/// A change published by the face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceTransition {
    /// `None` for override changes.
    pub event: Option<FaceEvent>,
    pub previous_phase: Phase,
    pub previous_expression: Expression,
    pub snapshot: FaceSnapshot,
}

/// Sole owner of the interaction state.
///
/// Parameters are always recomputed from the phase plus overrides, never from
/// the expression or from payloads.
#[derive(Debug, Clone)]
pub struct FaceMachine {
    snapshot: FaceSnapshot,
}

impl FaceMachine {
    pub fn new(overrides: ParameterOverrides) -> Self {
        Self {
            snapshot: FaceSnapshot::initial(overrides),
        }
    }

    pub fn snapshot(&self) -> FaceSnapshot {
        self.snapshot
    }

    /// Apply an event. Returns `None` when it changes nothing.
    pub fn apply(&mut self, event: FaceEvent, now: SystemTime) -> Option<FaceTransition> {
        let previous = self.snapshot;
        let (phase, expression) = transition((previous.phase, previous.expression), event);

        if phase == previous.phase && expression == previous.expression {
            debug!("Face event {:?} left {}/{} unchanged", event, phase, expression);
            return None;
        }

        if phase != previous.phase {
            info!(
                "Face phase {} -> {} ({:?}, expression {})",
                previous.phase, phase, event, expression
            );
        } else {
            debug!(
                "Face expression {} -> {} ({:?})",
                previous.expression, expression, event
            );
        }

        self.snapshot = FaceSnapshot {
            phase,
            expression,
            parameters: previous.overrides.apply(phase.parameters()),
            overrides: previous.overrides,
            since: now,
            revision: previous.revision + 1,
        };

        Some(FaceTransition {
            event: Some(event),
            previous_phase: previous.phase,
            previous_expression: previous.expression,
            snapshot: self.snapshot,
        })
    }

    /// Replace the overrides. Non-finite values are rejected and leave the
    /// state untouched.
    pub fn set_overrides(
        &mut self,
        overrides: ParameterOverrides,
    ) -> Result<FaceTransition, ModelError> {
        overrides.validate()?;
        Ok(self.replace_overrides(overrides))
    }

    pub fn clear_overrides(&mut self) -> FaceTransition {
        self.replace_overrides(ParameterOverrides::default())
    }

    fn replace_overrides(&mut self, overrides: ParameterOverrides) -> FaceTransition {
        let previous = self.snapshot;
        self.snapshot = FaceSnapshot {
            parameters: overrides.apply(previous.phase.parameters()),
            overrides,
            revision: previous.revision + 1,
            ..previous
        };

        debug!("Face overrides set to {:?}", overrides);

        FaceTransition {
            event: None,
            previous_phase: previous.phase,
            previous_expression: previous.expression,
            snapshot: self.snapshot,
        }
    }
}
