// ABOUTME: Participant session wiring
// ABOUTME: Builds the transport stack, runs heartbeats and telemetry, tears down deterministically

use crate::engine::{now_millis, SyncEngine};
use crate::media;
use crate::presence::battery::{
    detect_power_source, BatteryMonitor, BatteryReading, BATTERY_POLL_INTERVAL,
};
use crate::presence::{PresenceTracker, DEFAULT_STALE_AFTER, HEARTBEAT_INTERVAL};
use crate::protocol::messages::{DeviceRecord, DeviceRole, MessageBody, SyncMessage};
use crate::protocol::relay::PresenceMeta;
use crate::transport::{
    CompositeTransport, EventHandler, LocalHub, RelayTransport, SyncTransport, TransportEvent,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Configuration for one participant session
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Human-readable device name shown in rosters
    pub display_name: String,
    /// Admin or viewer
    pub role: DeviceRole,
    /// Relay WebSocket URL; `None` runs local-only
    pub relay_url: Option<String>,
    /// How often this participant re-announces itself
    pub heartbeat_interval: Duration,
    /// How long silent peers stay in the roster
    pub stale_after: Duration,
    /// How often the battery capability is polled
    pub battery_poll_interval: Duration,
    /// Seed the library with the demo items at startup
    pub seed_demo_library: bool,
}

impl SessionConfig {
    /// Create a configuration for the given name and role
    pub fn new(display_name: impl Into<String>, role: DeviceRole) -> Self {
        Self {
            display_name: display_name.into(),
            role,
            ..Default::default()
        }
    }

    /// Set the relay URL
    pub fn relay_url(mut self, url: impl Into<String>) -> Self {
        self.relay_url = Some(url.into());
        self
    }

    /// Set the heartbeat interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the roster staleness threshold
    pub fn stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Seed the demo library at startup
    pub fn seed_demo_library(mut self, seed: bool) -> Self {
        self.seed_demo_library = seed;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            display_name: "Viewer".to_string(),
            role: DeviceRole::Viewer,
            relay_url: None,
            heartbeat_interval: HEARTBEAT_INTERVAL,
            stale_after: DEFAULT_STALE_AFTER,
            battery_poll_interval: BATTERY_POLL_INTERVAL,
            seed_demo_library: false,
        }
    }
}

/// One running participant
///
/// Owns the engine, the presence tracker, the composite transport, and
/// every background task the participant needs. [`SyncSession::shutdown`]
/// is the only correct way to leave: it announces departure, closes the
/// transports, and cancels the timers, so no handler can apply stale state
/// to a torn-down instance.
pub struct SyncSession {
    device_id: String,
    config: SessionConfig,
    engine: SyncEngine,
    tracker: PresenceTracker,
    transport: Arc<CompositeTransport>,
    relay: Option<Arc<RelayTransport>>,
    battery: Arc<Mutex<Option<BatteryReading>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncSession {
    /// Start a participant attached to `hub` (requires a tokio runtime)
    pub fn start(config: SessionConfig, hub: &LocalHub) -> Self {
        let device_id = uuid::Uuid::new_v4().to_string();

        let mut members: Vec<Arc<dyn SyncTransport>> = vec![Arc::new(hub.attach())];
        let relay = config.relay_url.as_ref().map(|url| {
            let relay = Arc::new(RelayTransport::new(url.clone()));
            relay.start();
            relay
        });
        if let Some(relay) = &relay {
            members.push(Arc::clone(relay) as Arc<dyn SyncTransport>);
        }

        let transport = Arc::new(CompositeTransport::new(members));
        let engine = SyncEngine::new(
            config.role,
            Arc::clone(&transport) as Arc<dyn SyncTransport>,
        );
        let tracker = PresenceTracker::with_stale_after(config.stale_after);
        let battery = Arc::new(Mutex::new(None));

        // Inbound plumbing: roster updates feed the tracker, everything
        // else feeds the engine
        let engine_rx = engine.clone();
        let tracker_rx = tracker.clone();
        let refs = SessionRefs {
            device_id: device_id.clone(),
            display_name: config.display_name.clone(),
            role: config.role,
            tracker: tracker.clone(),
            transport: Arc::clone(&transport),
            battery: Arc::clone(&battery),
        };
        let handler: EventHandler = Arc::new(move |event| match event {
            TransportEvent::Message(message) => {
                match &message.body {
                    MessageBody::DeviceUpdate(record) => tracker_rx.apply_update(record),
                    MessageBody::RequestState if refs.role == DeviceRole::Admin => {
                        // A joiner is bootstrapping; introduce this device
                        // alongside the engine's state replay
                        refs.broadcast_self_record();
                    }
                    _ => {}
                }
                engine_rx.handle_message(&message);
            }
            TransportEvent::PresenceSync(entries) => tracker_rx.apply_snapshot(&entries),
            TransportEvent::ConnectivityChanged(up) => {
                if up {
                    log::info!("networked sync path up");
                } else {
                    log::info!("networked sync path down, local mode");
                }
            }
        });
        transport.subscribe(handler);

        let session = Self {
            device_id,
            config,
            engine,
            tracker,
            transport,
            relay,
            battery,
            tasks: Mutex::new(Vec::new()),
        };

        session.bootstrap();
        session.spawn_heartbeat();
        session.spawn_battery_poll();
        session.spawn_stale_sweep();
        session
    }

    /// Announce, seed, and (for viewers) ask the admin for current state
    fn bootstrap(&self) {
        if self.config.seed_demo_library && self.engine.role() == DeviceRole::Admin {
            for descriptor in media::demo_library() {
                self.engine.add_media(descriptor);
            }
        }

        self.transport.announce(&self.presence_meta());
        self.broadcast_self_record();

        if self.engine.role() == DeviceRole::Viewer {
            // The admin replies asynchronously; no admin present just
            // leaves the defaults in place
            self.engine.request_state();
        }
    }

    fn presence_meta(&self) -> PresenceMeta {
        PresenceMeta {
            device_id: self.device_id.clone(),
            display_name: self.config.display_name.clone(),
            role: self.config.role,
            online_at: now_millis(),
        }
    }

    /// Current self record, including battery telemetry when available
    fn self_record(&self) -> DeviceRecord {
        let mut record = DeviceRecord::new(
            self.device_id.clone(),
            self.config.display_name.clone(),
            self.config.role,
            now_millis(),
        );
        if let Some(reading) = *self.battery.lock() {
            record.battery_level = Some(reading.level);
            record.battery_charging = Some(reading.charging);
        }
        record
    }

    /// Broadcast this device's record and keep it in the local roster
    fn broadcast_self_record(&self) {
        let record = self.self_record();
        self.tracker.apply_update(&record);
        self.transport.send(&SyncMessage::new(
            now_millis(),
            MessageBody::DeviceUpdate(record),
        ));
    }

    fn spawn_heartbeat(&self) {
        let session = self.clone_refs();
        let interval = self.config.heartbeat_interval;
        self.tasks.lock().push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // immediate first tick already covered by bootstrap
            loop {
                ticker.tick().await;
                session.broadcast_self_record();
            }
        }));
    }

    fn spawn_battery_poll(&self) {
        // Viewer-only capability; absence of a power source is normal
        if self.config.role != DeviceRole::Viewer {
            return;
        }
        let Some(source) = detect_power_source() else {
            return;
        };

        let session = self.clone_refs();
        let interval = self.config.battery_poll_interval;
        self.tasks.lock().push(tokio::spawn(async move {
            let mut monitor = BatteryMonitor::new();
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(reading) = source.read() else {
                    continue;
                };
                monitor.observe(&reading);

                let changed = *session.battery.lock() != Some(reading);
                if changed {
                    *session.battery.lock() = Some(reading);
                    session.broadcast_self_record();
                }
            }
        }));
    }

    fn spawn_stale_sweep(&self) {
        let tracker = self.tracker.clone();
        let period = self.config.stale_after / 4;
        self.tasks.lock().push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period.max(Duration::from_secs(1)));
            loop {
                ticker.tick().await;
                tracker.sweep_stale();
            }
        }));
    }

    /// Shallow handle sharing the session's state for background tasks
    fn clone_refs(&self) -> SessionRefs {
        SessionRefs {
            device_id: self.device_id.clone(),
            display_name: self.config.display_name.clone(),
            role: self.config.role,
            tracker: self.tracker.clone(),
            transport: Arc::clone(&self.transport),
            battery: Arc::clone(&self.battery),
        }
    }

    /// This participant's opaque device id
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// The participant's display name
    pub fn display_name(&self) -> &str {
        &self.config.display_name
    }

    /// The sync engine
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// The presence tracker
    pub fn tracker(&self) -> &PresenceTracker {
        &self.tracker
    }

    /// Whether the networked path currently has a live link
    pub fn is_online(&self) -> bool {
        match &self.relay {
            Some(relay) => relay.is_connected(),
            None => false,
        }
    }

    /// Feed an external connectivity signal to the networked path
    pub fn set_online(&self, online: bool) {
        if let Some(relay) = &self.relay {
            relay.set_online(online);
        }
    }

    /// Leave the channel: announce departure, close transports, cancel timers
    pub fn shutdown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.transport.depart();
        self.transport.close();
        log::info!("session {} shut down", self.device_id);
    }
}

/// State shared with background tasks and the inbound handler
#[derive(Clone)]
struct SessionRefs {
    device_id: String,
    display_name: String,
    role: DeviceRole,
    tracker: PresenceTracker,
    transport: Arc<CompositeTransport>,
    battery: Arc<Mutex<Option<BatteryReading>>>,
}

impl SessionRefs {
    fn broadcast_self_record(&self) {
        let mut record = DeviceRecord::new(
            self.device_id.clone(),
            self.display_name.clone(),
            self.role,
            now_millis(),
        );
        if let Some(reading) = *self.battery.lock() {
            record.battery_level = Some(reading.level);
            record.battery_charging = Some(reading.charging);
        }
        self.tracker.apply_update(&record);
        self.transport.send(&SyncMessage::new(
            now_millis(),
            MessageBody::DeviceUpdate(record),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_admin_and_viewer_share_a_hub() {
        let hub = LocalHub::new();
        let admin = SyncSession::start(
            SessionConfig::new("Admin Console", DeviceRole::Admin).seed_demo_library(true),
            &hub,
        );
        let viewer = SyncSession::start(
            SessionConfig::new("Headset 1", DeviceRole::Viewer),
            &hub,
        );

        // Hub delivery is synchronous: the viewer bootstrap has already run
        assert_eq!(viewer.engine().library().len(), 2);

        let first = admin.engine().library()[0].id.clone();
        admin.engine().load_media(&first);
        admin.engine().play();

        let state = viewer.engine().playback_state();
        assert_eq!(state.active_media_id.as_deref(), Some(first.as_str()));
        assert!(state.is_playing);

        // Both rosters know both devices
        assert_eq!(admin.tracker().device_count(), 2);
        assert_eq!(viewer.tracker().device_count(), 2);

        viewer.shutdown();
        admin.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_releases_the_reception_slot() {
        let hub = LocalHub::new();
        let admin = SyncSession::start(
            SessionConfig::new("Admin Console", DeviceRole::Admin),
            &hub,
        );
        let viewer = SyncSession::start(
            SessionConfig::new("Headset 1", DeviceRole::Viewer),
            &hub,
        );

        viewer.shutdown();

        // Departure removed the viewer from the admin roster
        assert_eq!(admin.tracker().device_count(), 1);

        // A torn-down viewer no longer applies state
        admin.engine().play();
        assert!(!viewer.engine().playback_state().is_playing);

        admin.shutdown();
    }

    #[tokio::test]
    async fn test_viewer_without_admin_stays_at_defaults() {
        let hub = LocalHub::new();
        let viewer = SyncSession::start(
            SessionConfig::new("Headset 1", DeviceRole::Viewer),
            &hub,
        );

        let state = viewer.engine().playback_state();
        assert!(state.active_media_id.is_none());
        assert!(!state.is_playing);

        viewer.shutdown();
    }
}
