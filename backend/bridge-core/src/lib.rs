//! Session transport and conversation state for the Yes-Man face.
//!
//! The [`bridge`] module owns the WebSocket link to the processing core and keeps
//! it alive (reconnect, liveness, outbound buffering). The [`face`] module turns
//! the envelopes flowing over that link into the interaction state the face
//! renders. Everything runs as small tokio actors talking over channels.

pub mod bridge;
pub mod config;
pub mod error;
pub mod face;
pub mod peer;
pub mod protocol;
pub mod pubsub;
pub mod settings;

#[cfg(test)]
mod tests;

pub const CORE_HOSTNAME: &str = "127.0.0.1";
pub const CORE_PORT: u16 = 8765;
pub const CORE_URL: &str = const_format::concatcp!("ws://", CORE_HOSTNAME, ":", CORE_PORT);
