// ABOUTME: Sync transport abstraction
// ABOUTME: One contract over the local in-process bus and the networked relay

mod composite;
mod local;
mod relay;

pub use composite::CompositeTransport;
pub use local::{LocalHub, LocalTransport};
pub use relay::RelayTransport;

use crate::protocol::messages::SyncMessage;
use crate::protocol::relay::PresenceMeta;
use std::sync::Arc;

/// Callback invoked once per received transport event
pub type EventHandler = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Something a transport delivered to this participant
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A sync message from another participant
    Message(SyncMessage),
    /// Authoritative roster snapshot (relay-backed transports only)
    PresenceSync(Vec<PresenceMeta>),
    /// The networked path came up or went down
    ConnectivityChanged(bool),
}

/// Best-effort delivery of sync messages to all other participants
///
/// Implementations never block on the network and never acknowledge
/// delivery; ordering across transports is not guaranteed. `close` must be
/// called on participant shutdown: a subscription that outlives its
/// participant can apply stale state to a torn-down instance.
pub trait SyncTransport: Send + Sync {
    /// Fire-and-forget broadcast to all other participants
    fn send(&self, message: &SyncMessage);

    /// Announce or refresh this participant's presence
    fn announce(&self, meta: &PresenceMeta);

    /// Best-effort departure announcement
    fn depart(&self);

    /// Register a handler invoked once per received event, for the
    /// lifetime of the transport
    fn subscribe(&self, handler: EventHandler);

    /// Tear down the transport, releasing tasks and subscriptions
    fn close(&self);
}
