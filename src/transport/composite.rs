// ABOUTME: Composite transport fanning one logical send out to every member
// ABOUTME: Dual-path redundancy: offline participants still sync over the local bus

use crate::protocol::messages::SyncMessage;
use crate::protocol::relay::PresenceMeta;
use crate::transport::{EventHandler, SyncTransport, TransportEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Fans a single logical `send` out to each live concrete transport
///
/// Members are independent: one transport failing, closed, or offline never
/// affects delivery through the others. Subscribers registered here hear
/// events from every member; duplicate delivery of the same message over
/// two paths is harmless because the engine's apply rules are idempotent.
pub struct CompositeTransport {
    members: Vec<Arc<dyn SyncTransport>>,
    online: Arc<AtomicBool>,
}

impl CompositeTransport {
    /// Compose the given member transports
    pub fn new(members: Vec<Arc<dyn SyncTransport>>) -> Self {
        let online = Arc::new(AtomicBool::new(false));

        // Track the networked path's state for the "local mode" indicator
        let flag = Arc::clone(&online);
        let tracker: EventHandler = Arc::new(move |event| {
            if let TransportEvent::ConnectivityChanged(up) = event {
                flag.store(up, Ordering::SeqCst);
            }
        });
        for member in &members {
            member.subscribe(tracker.clone());
        }

        Self { members, online }
    }

    /// Whether any networked member currently has a live link
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

impl SyncTransport for CompositeTransport {
    fn send(&self, message: &SyncMessage) {
        for member in &self.members {
            member.send(message);
        }
    }

    fn announce(&self, meta: &PresenceMeta) {
        for member in &self.members {
            member.announce(meta);
        }
    }

    fn depart(&self) {
        for member in &self.members {
            member.depart();
        }
    }

    fn subscribe(&self, handler: EventHandler) {
        for member in &self.members {
            member.subscribe(handler.clone());
        }
    }

    fn close(&self) {
        for member in &self.members {
            member.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::MessageBody;
    use crate::transport::LocalHub;
    use parking_lot::Mutex;

    #[test]
    fn test_send_fans_out_to_all_members() {
        // Two hubs standing in for two independent delivery paths
        let hub_a = LocalHub::new();
        let hub_b = LocalHub::new();

        let composite = CompositeTransport::new(vec![
            Arc::new(hub_a.attach()),
            Arc::new(hub_b.attach()),
        ]);

        let seen_a: Arc<Mutex<Vec<TransportEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_b: Arc<Mutex<Vec<TransportEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_a = Arc::clone(&seen_a);
        let sink_b = Arc::clone(&seen_b);
        hub_a
            .attach()
            .subscribe(Arc::new(move |event| sink_a.lock().push(event)));
        hub_b
            .attach()
            .subscribe(Arc::new(move |event| sink_b.lock().push(event)));

        composite.send(&SyncMessage::new(1, MessageBody::RequestState));

        assert_eq!(seen_a.lock().len(), 1);
        assert_eq!(seen_b.lock().len(), 1);
    }

    #[test]
    fn test_closed_member_does_not_affect_the_other() {
        let hub_a = LocalHub::new();
        let hub_b = LocalHub::new();

        let member_a = Arc::new(hub_a.attach());
        let member_b = Arc::new(hub_b.attach());
        member_a.close();

        let composite =
            CompositeTransport::new(vec![member_a, member_b]);

        let seen_b: Arc<Mutex<Vec<TransportEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_b = Arc::clone(&seen_b);
        hub_b
            .attach()
            .subscribe(Arc::new(move |event| sink_b.lock().push(event)));

        composite.send(&SyncMessage::new(1, MessageBody::RequestState));

        assert_eq!(seen_b.lock().len(), 1);
    }

    #[test]
    fn test_starts_in_local_mode() {
        let hub = LocalHub::new();
        let composite = CompositeTransport::new(vec![Arc::new(hub.attach())]);
        assert!(!composite.is_online());
    }
}
