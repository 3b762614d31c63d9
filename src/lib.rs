// ABOUTME: Main library entry point for viewsync
// ABOUTME: Exports public API for the playback sync engine, transports, and relay

//! # viewsync
//!
//! Synchronized media playback across viewer devices from a single admin console.
//!
//! One admin participant owns the authoritative "now playing" state and the
//! media library; any number of viewer participants replicate both through a
//! small last-writer-wins protocol that tolerates viewer churn, out-of-order
//! delivery, and dual (online/offline) transport paths.
//!
//! ## Features
//!
//! - **Engine**: authoritative playback state + library with admin-only mutation
//! - **Transports**: in-process local bus and WebSocket relay, composable
//! - **Presence**: live device roster derived from transport events
//! - **Relay**: host a pub/sub relay for cross-device synchronization
//!
//! ## Example: Running a Relay
//!
//! ```no_run
//! use viewsync::relay::{RelayConfig, RelayServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RelayConfig::new("My Relay")
//!         .bind_addr("0.0.0.0:8931".parse().unwrap());
//!
//!     RelayServer::with_config(config).run().await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

/// Presentation surfaces for admin and viewer consoles
pub mod console;
/// Sync engine owning playback state and the media library
pub mod engine;
/// Media ingestion collaborator (descriptors, file probing, demo seed)
pub mod media;
/// Presence roster tracking and battery telemetry
pub mod presence;
/// Wire-level message vocabulary and relay framing
pub mod protocol;
/// Hosted pub/sub relay backend
pub mod relay;
/// Participant session wiring (transports, heartbeats, teardown)
pub mod session;
/// Sync transport abstraction and concrete transports
pub mod transport;

pub use engine::SyncEngine;
pub use protocol::messages::{MediaItem, PlaybackState, SyncMessage};
pub use relay::{RelayConfig, RelayServer};
pub use session::{SessionConfig, SyncSession};

/// Result type for viewsync operations
pub type Result<T> = std::result::Result<T, error::Error>;

/// Error types for viewsync
pub mod error {
    use thiserror::Error;

    /// Error types for viewsync operations
    #[derive(Error, Debug)]
    pub enum Error {
        /// Transport-level delivery error
        #[error("Transport error: {0}")]
        Transport(String),

        /// Protocol violation or parsing error
        #[error("Protocol error: {0}")]
        Protocol(String),

        /// Invalid message format received
        #[error("Invalid message format")]
        InvalidMessage,

        /// Connection-related error
        #[error("Connection error: {0}")]
        Connection(String),

        /// Media ingestion error
        #[error("Media error: {0}")]
        Media(String),
    }
}
