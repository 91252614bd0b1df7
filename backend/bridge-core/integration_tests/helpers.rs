//! Test helpers for bridge integration tests.
//!
//! Every test runs against an in-process core endpoint bound to an ephemeral
//! port, so tests never depend on a real processing core.

use bridge_core::config::BridgeConfig;
use bridge_core::peer::{CoreEndpointHandle, EndpointConfig, start_core_endpoint};

use std::time::Duration;

use tokio::net::TcpListener;

pub const WAIT: Duration = Duration::from_secs(5);

/// Start an endpoint on an ephemeral port.
pub async fn start_endpoint() -> CoreEndpointHandle {
    start_core_endpoint(EndpointConfig::default())
        .await
        .expect("Failed to start core endpoint")
}

/// Bridge config with short timers, pointed at `url`.
pub fn fast_config(url: &str) -> BridgeConfig {
    let mut config = BridgeConfig::for_url(url);
    config.core.connect_timeout_ms = 1_000;
    config.liveness.check_interval_ms = 20;
    config.reconnect.base_delay_ms = 50;
    config.reconnect.max_delay_ms = 500;
    config
}

/// URL of a port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind throwaway listener");
    let addr = listener.local_addr().expect("Throwaway listener has no address");
    drop(listener);
    format!("ws://{}", addr)
}

/// Poll `condition` every 10ms until it holds or `timeout` passes.
pub async fn wait_until<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    true
}
