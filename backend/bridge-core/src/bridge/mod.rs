//! Auto-reconnecting duplex link to the processing core.

pub mod channel;
mod link;
pub mod liveness;
pub mod outbound;
pub mod reconnect;
pub mod stats;

pub use channel::BridgeChannel;
pub use stats::ChannelStats;
