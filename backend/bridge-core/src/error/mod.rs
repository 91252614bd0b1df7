pub mod bridge;
pub mod config;
pub mod face;
pub mod protocol;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Bridge(#[from] bridge::BridgeError),

    #[error(transparent)]
    Protocol(#[from] protocol::ProtocolError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Face(#[from] face::FaceError),
}
