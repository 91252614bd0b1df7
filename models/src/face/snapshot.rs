use crate::face::parameters::{FaceParameters, ParameterOverrides};
use crate::face::{Expression, Phase};

use std::time::{Duration, SystemTime};

/// Consistent view of the interaction state at one revision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceSnapshot {
    pub phase: Phase,
    pub expression: Expression,
    /// Phase baseline with overrides applied.
    pub parameters: FaceParameters,
    pub overrides: ParameterOverrides,
    /// Time of the last phase or expression change.
    pub since: SystemTime,
    /// Bumped on every published change.
    pub revision: u64,
}

impl FaceSnapshot {
    pub fn initial(overrides: ParameterOverrides) -> Self {
        let phase = Phase::default();
        Self {
            phase,
            expression: Expression::default(),
            parameters: overrides.apply(phase.parameters()),
            overrides,
            since: SystemTime::now(),
            revision: 0,
        }
    }

    /// How long the face has been in its current phase/expression.
    pub fn state_duration(&self, now: SystemTime) -> Duration {
        now.duration_since(self.since).unwrap_or_default()
    }
}
