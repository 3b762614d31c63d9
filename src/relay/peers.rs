// ABOUTME: Peer connection registry
// ABOUTME: Thread-safe registry of relay peers with fan-out and presence state

use crate::protocol::relay::{PresenceMeta, RelayFrame};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Unique peer identifier, scoped to one connection
pub type PeerId = String;

/// A connected relay peer
#[derive(Debug)]
pub struct ConnectedPeer {
    /// Unique peer identifier
    pub peer_id: PeerId,
    /// Channel carrying serialized frames to this peer
    pub tx: mpsc::UnboundedSender<String>,
    /// Presence identity, once the peer has tracked itself
    pub presence: Option<PresenceMeta>,
    /// When the peer was last heard from
    pub last_seen: Instant,
}

impl ConnectedPeer {
    /// Create a peer that has not yet tracked presence
    pub fn new(peer_id: PeerId, tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            peer_id,
            tx,
            presence: None,
            last_seen: Instant::now(),
        }
    }

    /// Queue a frame for this peer
    pub fn send(&self, json: &str) -> bool {
        self.tx.send(json.to_string()).is_ok()
    }
}

/// Manages all connected peers
#[derive(Debug)]
pub struct PeerRegistry {
    /// Map of peer_id to peer
    peers: Arc<RwLock<HashMap<PeerId, ConnectedPeer>>>,
}

impl PeerRegistry {
    /// Create a new peer registry
    pub fn new() -> Self {
        Self {
            peers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a peer to the registry
    pub fn add_peer(&self, peer: ConnectedPeer) {
        let peer_id = peer.peer_id.clone();
        self.peers.write().insert(peer_id.clone(), peer);
        log::info!("peer {} added, total peers: {}", peer_id, self.peer_count());
    }

    /// Remove a peer, returning whether it had tracked presence
    pub fn remove_peer(&self, peer_id: &str) -> bool {
        let removed = self.peers.write().remove(peer_id);
        match removed {
            Some(peer) => {
                log::info!("peer {} removed, total peers: {}", peer_id, self.peer_count());
                peer.presence.is_some()
            }
            None => false,
        }
    }

    /// Number of connected peers
    pub fn peer_count(&self) -> usize {
        self.peers.read().len()
    }

    /// Refresh a peer's liveness; any inbound frame counts
    pub fn touch(&self, peer_id: &str) {
        if let Some(peer) = self.peers.write().get_mut(peer_id) {
            peer.last_seen = Instant::now();
        }
    }

    /// Record a peer's presence identity
    ///
    /// Returns true when membership changed (first track or a changed
    /// identity), which is when peers need a fresh snapshot; a plain
    /// heartbeat refresh returns false.
    pub fn set_presence(&self, peer_id: &str, meta: PresenceMeta) -> bool {
        let mut peers = self.peers.write();
        let Some(peer) = peers.get_mut(peer_id) else {
            return false;
        };

        let changed = match &peer.presence {
            Some(existing) => {
                existing.device_id != meta.device_id
                    || existing.display_name != meta.display_name
                    || existing.role != meta.role
            }
            None => true,
        };
        peer.presence = Some(meta);
        changed
    }

    /// Clear a peer's presence identity (departure announcement)
    ///
    /// Returns true when the peer was actually tracked.
    pub fn clear_presence(&self, peer_id: &str) -> bool {
        let mut peers = self.peers.write();
        match peers.get_mut(peer_id) {
            Some(peer) => peer.presence.take().is_some(),
            None => false,
        }
    }

    /// Forward a serialized frame to every peer except the sender
    pub fn broadcast_from(&self, sender_id: &str, json: &str) {
        let peers = self.peers.read();
        for peer in peers.values() {
            if peer.peer_id != sender_id {
                let _ = peer.send(json);
            }
        }
    }

    /// The current roster of tracked peers
    pub fn presence_snapshot(&self) -> Vec<PresenceMeta> {
        let peers = self.peers.read();
        let mut entries: Vec<PresenceMeta> = peers
            .values()
            .filter_map(|peer| peer.presence.clone())
            .collect();
        entries.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        entries
    }

    /// Push the authoritative presence snapshot to every peer
    pub fn broadcast_presence_snapshot(&self) {
        let snapshot = self.presence_snapshot();
        let tracked = snapshot.len();
        let frame = RelayFrame::PresenceSync(snapshot);
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                log::error!("failed to serialize presence snapshot: {}", e);
                return;
            }
        };
        let peers = self.peers.read();
        for peer in peers.values() {
            let _ = peer.send(&json);
        }
        log::debug!(
            "presence snapshot ({} tracked) sent to {} peers",
            tracked,
            peers.len()
        );
    }

    /// Push the current snapshot to a single peer (new connections)
    pub fn send_snapshot_to(&self, peer_id: &str) {
        let frame = RelayFrame::PresenceSync(self.presence_snapshot());
        if let Ok(json) = serde_json::to_string(&frame) {
            if let Some(peer) = self.peers.read().get(peer_id) {
                let _ = peer.send(&json);
            }
        }
    }

    /// Drop peers not heard from within `stale_after`
    ///
    /// Participants heartbeat well inside the threshold, so silence means
    /// the connection is dead even if the socket has not errored yet.
    /// Returns whether any dropped peer had tracked presence.
    pub fn sweep_stale(&self, stale_after: Duration) -> bool {
        let mut peers = self.peers.write();
        let before = peers.len();
        let mut dropped_presence = false;
        peers.retain(|peer_id, peer| {
            let stale = peer.last_seen.elapsed() > stale_after;
            if stale {
                log::info!("removing stale peer {}", peer_id);
                dropped_presence |= peer.presence.is_some();
            }
            !stale
        });
        if peers.len() != before {
            log::debug!("stale sweep removed {} peers", before - peers.len());
        }
        dropped_presence
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PeerRegistry {
    fn clone(&self) -> Self {
        Self {
            peers: Arc::clone(&self.peers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::DeviceRole;

    fn meta(device_id: &str) -> PresenceMeta {
        PresenceMeta {
            device_id: device_id.to_string(),
            display_name: format!("Device {}", device_id),
            role: DeviceRole::Viewer,
            online_at: 0,
        }
    }

    fn peer(id: &str) -> (ConnectedPeer, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectedPeer::new(id.to_string(), tx), rx)
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        let registry = PeerRegistry::new();
        let (peer_a, mut rx_a) = peer("a");
        let (peer_b, mut rx_b) = peer("b");
        registry.add_peer(peer_a);
        registry.add_peer(peer_b);

        registry.broadcast_from("a", "{\"hello\":1}");

        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), "{\"hello\":1}");
    }

    #[test]
    fn test_snapshot_reflects_tracked_peers_only() {
        let registry = PeerRegistry::new();
        let (peer_a, _rx_a) = peer("a");
        let (peer_b, _rx_b) = peer("b");
        registry.add_peer(peer_a);
        registry.add_peer(peer_b);

        assert!(registry.presence_snapshot().is_empty());

        assert!(registry.set_presence("a", meta("dev-a")));
        let snapshot = registry.presence_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].device_id, "dev-a");

        // Heartbeat refresh is not a membership change
        assert!(!registry.set_presence("a", meta("dev-a")));

        assert!(registry.clear_presence("a"));
        assert!(registry.presence_snapshot().is_empty());
    }

    #[test]
    fn test_stale_sweep_drops_silent_peers() {
        let registry = PeerRegistry::new();
        let (peer_a, _rx_a) = peer("a");
        registry.add_peer(peer_a);
        registry.set_presence("a", meta("dev-a"));

        // Nothing is stale under a generous threshold
        assert!(!registry.sweep_stale(Duration::from_secs(60)));
        assert_eq!(registry.peer_count(), 1);

        // Everything is stale under a zero threshold
        std::thread::sleep(Duration::from_millis(5));
        assert!(registry.sweep_stale(Duration::from_millis(0)));
        assert_eq!(registry.peer_count(), 0);
    }
}
