//! Shared plumbing for the Yes-Man face bridge.
//!
//! Every error type in the workspace records where it was raised through
//! [`ErrorLocation`], so this crate sits below `models`, `bridge-core` and the
//! host application.

pub mod error;

pub use error::error_location::ErrorLocation;
