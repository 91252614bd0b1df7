//! Loopback stand-in for the processing core.
//!
//! Speaks the core's side of the envelope protocol: greets every client with
//! `system_status`, answers client heartbeats, broadcasts payloads and records
//! what it receives. Integration tests drive the bridge against it, and it can be
//! made silent or drop its clients to simulate a hung or restarted core.

pub mod handle;
pub mod server;

pub use handle::{CoreEndpointHandle, EndpointStatsSnapshot};
pub use server::{EndpointConfig, start_core_endpoint};
