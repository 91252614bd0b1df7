//! Yes-Man face host.
//!
//! Owns one bridge channel, one face store and the persisted settings, and
//! wires them together for whatever renders the face. `main.rs` runs it
//! headless until ctrl-c.

pub mod error;
pub mod host;
pub mod logger;
pub mod paths;
