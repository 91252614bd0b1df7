//! Conversation state machine and the plumbing around it.
//!
//! [`transition`] is the pure event table, [`machine::FaceMachine`] applies it to
//! an owned snapshot, [`store::FaceStore`] runs the machine as an actor, and
//! [`link::attach_face`] feeds it from a bridge channel.

pub mod link;
pub mod machine;
pub mod store;
pub mod transition;

pub use link::{FaceLink, attach_face};
pub use machine::{FaceMachine, FaceTransition};
pub use store::FaceStore;
pub use transition::{FaceEvent, transition};
