//! Domain models for the Yes-Man face bridge.
//!
//! This crate contains pure data structures shared by the bridge and the host:
//! envelopes exchanged with the processing core, the interaction state shown by
//! the face, and connection/service status records. Models carry no I/O and no
//! task plumbing.
//!
//! ## Architecture
//!
//! - **models** (this crate): Pure data structures
//! - **bridge-core**: Transport, protocol codec, state machine
//! - **yesman**: Host process wiring everything together

pub mod connection;
pub mod envelope;
pub mod error;
pub mod face;
pub mod services;

pub use common::ErrorLocation;
pub use connection::{ConnectionSnapshot, ConnectionStatus};
pub use envelope::builder::EnvelopeBuilder;
pub use envelope::kind::MessageKind;
pub use envelope::payload::{
    AgentResponse, ErrorReport, FaceStateChange, Heartbeat, LogEntry, LogLevel, Payload,
    SettingsUpdate, SystemCommand, SystemStatus, TtsEnd, TtsStart, UserInput, UserSpeechEnd,
    UserSpeechStart, WakeWordDetected,
};
pub use envelope::{Envelope, Origin};
pub use error::model_error::ModelError;
pub use face::parameters::{FaceParameters, ParameterOverrides};
pub use face::snapshot::FaceSnapshot;
pub use face::{Expression, Phase};
pub use services::ServiceHealth;

#[cfg(test)]
mod tests;
