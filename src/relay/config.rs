// ABOUTME: Relay configuration
// ABOUTME: Defines configurable parameters for the viewsync relay

use std::net::SocketAddr;
use std::time::Duration;

/// Relay configuration
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Address to bind the relay to
    pub bind_addr: SocketAddr,
    /// WebSocket endpoint path
    pub ws_path: String,
    /// Relay name for peer discovery
    pub name: String,
    /// Unique relay identifier
    pub relay_id: String,
    /// How long a silent peer stays registered
    pub peer_stale_after: Duration,
}

impl RelayConfig {
    /// Create a new relay configuration with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the WebSocket path
    pub fn ws_path(mut self, path: impl Into<String>) -> Self {
        self.ws_path = path.into();
        self
    }

    /// Set the peer staleness threshold
    pub fn peer_stale_after(mut self, stale_after: Duration) -> Self {
        self.peer_stale_after = stale_after;
        self
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8931".parse().unwrap(),
            ws_path: "/sync".to_string(),
            name: "ViewSync Relay".to_string(),
            relay_id: uuid::Uuid::new_v4().to_string(),
            peer_stale_after: Duration::from_secs(60),
        }
    }
}
