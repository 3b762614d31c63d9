// ABOUTME: Relay channel framing
// ABOUTME: Envelope spoken between participants and the relay, beneath the sync vocabulary

use crate::protocol::messages::{DeviceRole, SyncMessage};
use serde::{Deserialize, Serialize};

/// Frame exchanged over a relay connection
///
/// The relay never interprets sync payloads; it fans `broadcast` frames out
/// to every other peer and maintains presence from `track`/`untrack`. The
/// message vocabulary inside `broadcast` is identical to what the local
/// transport carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum RelayFrame {
    /// A sync message to deliver to all other peers
    Broadcast(SyncMessage),

    /// Announce or refresh this connection's presence
    Track(PresenceMeta),

    /// Best-effort departure announcement before closing
    Untrack,

    /// Authoritative roster snapshot (relay -> peers)
    PresenceSync(Vec<PresenceMeta>),
}

/// Presence identity tracked by the relay for one connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceMeta {
    /// Device id of the participant
    pub device_id: String,
    /// Human-readable device name
    pub display_name: String,
    /// Admin or viewer
    pub role: DeviceRole,
    /// When the participant came online (wall-clock milliseconds)
    pub online_at: u64,
}
