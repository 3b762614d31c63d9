// ABOUTME: Relay module for viewsync
// ABOUTME: Hosted pub/sub backend: WebSocket fan-out and presence tracking

mod cli;
mod config;
mod handler;
mod peers;
mod server;

pub use cli::RelayArgs;
pub use config::RelayConfig;
pub use handler::handle_peer;
pub use peers::{ConnectedPeer, PeerRegistry};
pub use server::RelayServer;
