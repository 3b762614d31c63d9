// ABOUTME: Local in-process broadcast transport
// ABOUTME: Same-process bus with sub-millisecond roundtrips, works without any network

use crate::engine::now_millis;
use crate::protocol::messages::{ConnectionStatus, DeviceRecord, MessageBody, SyncMessage};
use crate::protocol::relay::PresenceMeta;
use crate::transport::{EventHandler, SyncTransport, TransportEvent};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Handler slots for one attached participant
#[derive(Default)]
struct Slot {
    handlers: Vec<EventHandler>,
}

/// In-process broadcast bus
///
/// The Rust analogue of a same-origin broadcast channel: every participant
/// attached to the same hub hears every other participant, with no network
/// involved. A sender never receives its own messages.
pub struct LocalHub {
    slots: Arc<RwLock<HashMap<String, Slot>>>,
}

impl LocalHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Attach a new participant and hand back its transport
    pub fn attach(&self) -> LocalTransport {
        let id = uuid::Uuid::new_v4().to_string();
        self.slots.write().insert(id.clone(), Slot::default());
        log::debug!("local hub: participant {} attached", id);
        LocalTransport {
            id,
            slots: Arc::clone(&self.slots),
            announced: Mutex::new(None),
        }
    }

    /// Number of attached participants
    pub fn participant_count(&self) -> usize {
        self.slots.read().len()
    }
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LocalHub {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

/// One participant's handle on a [`LocalHub`]
pub struct LocalTransport {
    id: String,
    slots: Arc<RwLock<HashMap<String, Slot>>>,
    /// Last announced identity, replayed as the departure notice
    announced: Mutex<Option<PresenceMeta>>,
}

impl LocalTransport {
    /// Deliver an event to every attached participant except the sender
    ///
    /// Handlers are cloned out before invocation so a handler may call back
    /// into the transport without holding hub locks.
    fn broadcast(&self, event: TransportEvent) {
        let targets: Vec<EventHandler> = {
            let slots = self.slots.read();
            slots
                .iter()
                .filter(|(id, _)| id.as_str() != self.id)
                .flat_map(|(_, slot)| slot.handlers.iter().cloned())
                .collect()
        };

        for handler in targets {
            handler(event.clone());
        }
    }
}

impl SyncTransport for LocalTransport {
    fn send(&self, message: &SyncMessage) {
        self.broadcast(TransportEvent::Message(message.clone()));
    }

    fn announce(&self, meta: &PresenceMeta) {
        // The hub has no presence primitive of its own; an announcement
        // travels as an ordinary device-update that peers patch into their
        // rosters.
        *self.announced.lock() = Some(meta.clone());
        let record = DeviceRecord::new(
            meta.device_id.clone(),
            meta.display_name.clone(),
            meta.role,
            now_millis(),
        );
        let message = SyncMessage::new(now_millis(), MessageBody::DeviceUpdate(record));
        self.broadcast(TransportEvent::Message(message));
    }

    fn depart(&self) {
        let Some(meta) = self.announced.lock().clone() else {
            return;
        };
        let mut record = DeviceRecord::new(
            meta.device_id,
            meta.display_name,
            meta.role,
            now_millis(),
        );
        record.status = ConnectionStatus::Disconnected;
        let message = SyncMessage::new(now_millis(), MessageBody::DeviceUpdate(record));
        self.broadcast(TransportEvent::Message(message));
    }

    fn subscribe(&self, handler: EventHandler) {
        if let Some(slot) = self.slots.write().get_mut(&self.id) {
            slot.handlers.push(handler);
        }
    }

    fn close(&self) {
        self.slots.write().remove(&self.id);
        log::debug!("local hub: participant {} detached", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn collector() -> (EventHandler, Arc<Mutex<Vec<TransportEvent>>>) {
        let seen: Arc<Mutex<Vec<TransportEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: EventHandler = Arc::new(move |event| sink.lock().push(event));
        (handler, seen)
    }

    fn message() -> SyncMessage {
        SyncMessage::new(1, MessageBody::RequestState)
    }

    #[test]
    fn test_sender_does_not_hear_itself() {
        let hub = LocalHub::new();
        let a = hub.attach();
        let b = hub.attach();

        let (handler_a, seen_a) = collector();
        let (handler_b, seen_b) = collector();
        a.subscribe(handler_a);
        b.subscribe(handler_b);

        a.send(&message());

        assert!(seen_a.lock().is_empty());
        assert_eq!(seen_b.lock().len(), 1);
    }

    #[test]
    fn test_fan_out_to_all_other_participants() {
        let hub = LocalHub::new();
        let a = hub.attach();
        let b = hub.attach();
        let c = hub.attach();

        let (handler_b, seen_b) = collector();
        let (handler_c, seen_c) = collector();
        b.subscribe(handler_b);
        c.subscribe(handler_c);

        a.send(&message());
        a.send(&message());

        assert_eq!(seen_b.lock().len(), 2);
        assert_eq!(seen_c.lock().len(), 2);
    }

    #[test]
    fn test_close_releases_reception_slot() {
        let hub = LocalHub::new();
        let a = hub.attach();
        let b = hub.attach();

        let (handler_b, seen_b) = collector();
        b.subscribe(handler_b);
        b.close();
        assert_eq!(hub.participant_count(), 1);

        a.send(&message());
        assert!(seen_b.lock().is_empty());
    }

    #[test]
    fn test_handler_may_send_reentrantly() {
        let hub = LocalHub::new();
        let a = hub.attach();
        let b = Arc::new(hub.attach());
        let c = hub.attach();

        // b echoes a request back out, as an admin answering request-state does
        let echo = Arc::clone(&b);
        b.subscribe(Arc::new(move |event| {
            if matches!(event, TransportEvent::Message(_)) {
                echo.send(&SyncMessage::new(2, MessageBody::RequestState));
            }
        }));

        let (handler_c, seen_c) = collector();
        c.subscribe(handler_c);

        a.send(&message());

        // c hears both the original and the echo
        assert_eq!(seen_c.lock().len(), 2);
    }
}
