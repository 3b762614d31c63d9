// ABOUTME: WebSocket peer handler
// ABOUTME: Handles individual relay connections, frame routing, and presence bookkeeping

use crate::protocol::relay::RelayFrame;
use crate::relay::peers::{ConnectedPeer, PeerId, PeerRegistry};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Handle a WebSocket peer connection
pub async fn handle_peer(socket: WebSocket, registry: Arc<PeerRegistry>) {
    let peer_id: PeerId = uuid::Uuid::new_v4().to_string();
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Channel for relay->peer frames
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    registry.add_peer(ConnectedPeer::new(peer_id.clone(), tx));

    // Spawn task to forward queued frames to the WebSocket
    let peer_id_send = peer_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(json) = rx.recv().await {
            if ws_tx.send(WsMessage::Text(json.into())).await.is_err() {
                log::debug!("peer {} disconnected (send failed)", peer_id_send);
                break;
            }
        }
    });

    // A fresh connection immediately learns who is here
    registry.send_snapshot_to(&peer_id);

    // Handle incoming frames
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(WsMessage::Text(text)) => {
                handle_frame(&text, &peer_id, &registry);
            }
            Ok(WsMessage::Binary(data)) => {
                log::debug!("ignoring binary frame from {} ({} bytes)", peer_id, data.len());
            }
            Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => {
                // Handled automatically by axum
            }
            Ok(WsMessage::Close(_)) => {
                log::info!("peer {} closed connection", peer_id);
                break;
            }
            Err(e) => {
                log::warn!("WebSocket error for peer {}: {}", peer_id, e);
                break;
            }
        }
    }

    // Cleanup; a tracked peer's disappearance changes the roster
    let was_tracked = registry.remove_peer(&peer_id);
    if was_tracked {
        registry.broadcast_presence_snapshot();
    }
    send_task.abort();

    log::info!("peer {} disconnected", peer_id);
}

/// Route one inbound frame
fn handle_frame(text: &str, peer_id: &PeerId, registry: &PeerRegistry) {
    // Any frame proves the peer is alive
    registry.touch(peer_id);

    let frame = match serde_json::from_str::<RelayFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            log::warn!("failed to parse frame from {}: {}", peer_id, e);
            return;
        }
    };

    match frame {
        RelayFrame::Broadcast(_) => {
            // Content-agnostic fan-out; the raw text is forwarded untouched
            registry.broadcast_from(peer_id, text);
        }
        RelayFrame::Track(meta) => {
            log::debug!(
                "peer {} tracked as {} ({})",
                peer_id,
                meta.display_name,
                meta.device_id
            );
            if registry.set_presence(peer_id, meta) {
                registry.broadcast_presence_snapshot();
            }
        }
        RelayFrame::Untrack => {
            if registry.clear_presence(peer_id) {
                registry.broadcast_presence_snapshot();
            }
        }
        RelayFrame::PresenceSync(_) => {
            // Relay-originated frame; a peer has no business sending one
            log::debug!("ignoring presence-sync from peer {}", peer_id);
        }
    }
}
