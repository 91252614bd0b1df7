//! Interaction state shown by the face.

pub mod parameters;
pub mod snapshot;

use crate::face::parameters::FaceParameters;

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FormatResult};

/// Named interaction state. Starts at [`Phase::Idle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Listening,
    Thinking,
    Speaking,
    Error,
    Sleeping,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Idle,
        Phase::Listening,
        Phase::Thinking,
        Phase::Speaking,
        Phase::Error,
        Phase::Sleeping,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Listening => "listening",
            Phase::Thinking => "thinking",
            Phase::Speaking => "speaking",
            Phase::Error => "error",
            Phase::Sleeping => "sleeping",
        }
    }

    /// Baseline presentation parameters for this phase.
    pub const fn parameters(self) -> FaceParameters {
        match self {
            Phase::Idle => FaceParameters::new(0.3, 1.0, 0.0, 0.8, 1.0),
            Phase::Listening => FaceParameters::new(0.3, 1.2, 0.0, 1.0, 1.5),
            Phase::Thinking => FaceParameters::new(0.5, 1.0, 0.0, 0.6, 0.8),
            Phase::Speaking => FaceParameters::new(0.3, 1.0, 0.8, 1.0, 2.0),
            Phase::Error => FaceParameters::new(0.8, 1.0, 0.0, 1.0, 3.0),
            Phase::Sleeping => FaceParameters::new(0.1, 0.2, 0.0, 0.3, 0.3),
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(self.as_str())
    }
}

/// Facial expression layered on top of the phase. Never feeds parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    #[default]
    Neutral,
    Happy,
    Excited,
    Confused,
    Sad,
    Angry,
    Surprised,
}

impl Expression {
    pub const ALL: [Expression; 7] = [
        Expression::Neutral,
        Expression::Happy,
        Expression::Excited,
        Expression::Confused,
        Expression::Sad,
        Expression::Angry,
        Expression::Surprised,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Excited => "excited",
            Expression::Confused => "confused",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Surprised => "surprised",
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(self.as_str())
    }
}
