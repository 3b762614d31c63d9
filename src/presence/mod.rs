// ABOUTME: Presence roster tracking
// ABOUTME: The device roster is a projection of transport events, never mutated directly

/// Battery capability probe and low-battery monitor
pub mod battery;

use crate::engine::now_millis;
use crate::protocol::messages::{ConnectionStatus, DeviceRecord};
use crate::protocol::relay::PresenceMeta;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// How long a silent device stays in the roster
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60);

/// How often a participant re-announces itself
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Live roster of connected participants
///
/// Entries appear and disappear only in response to transport activity:
/// relay presence snapshots replace the roster wholesale, per-device
/// updates patch or insert, departure notices drop, and anything silent
/// past the staleness threshold ages out. Presentation code only reads.
pub struct PresenceTracker {
    devices: Arc<RwLock<HashMap<String, DeviceRecord>>>,
    stale_after: Duration,
}

impl PresenceTracker {
    /// Create a tracker with the default staleness threshold
    pub fn new() -> Self {
        Self::with_stale_after(DEFAULT_STALE_AFTER)
    }

    /// Create a tracker that ages silent devices out after `stale_after`
    pub fn with_stale_after(stale_after: Duration) -> Self {
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
            stale_after,
        }
    }

    /// Replace the roster with an authoritative snapshot
    pub fn apply_snapshot(&self, entries: &[PresenceMeta]) {
        let now = now_millis();
        let mut devices = self.devices.write();
        devices.clear();
        for entry in entries {
            devices.insert(
                entry.device_id.clone(),
                DeviceRecord::new(
                    entry.device_id.clone(),
                    entry.display_name.clone(),
                    entry.role,
                    now,
                ),
            );
        }
        log::debug!("presence snapshot applied, {} devices", devices.len());
    }

    /// Patch a record by id, inserting it when absent
    ///
    /// A departure notice (status `Disconnected`) drops the record instead.
    pub fn apply_update(&self, record: &DeviceRecord) {
        let mut devices = self.devices.write();

        if record.status == ConnectionStatus::Disconnected {
            if devices.remove(&record.id).is_some() {
                log::debug!("device {} departed", record.id);
            }
            return;
        }

        let mut patched = record.clone();
        patched.last_seen_at = now_millis();
        devices.insert(record.id.clone(), patched);
    }

    /// Drop devices not heard from within the staleness threshold
    ///
    /// Covers participants that died without announcing departure.
    pub fn sweep_stale(&self) -> usize {
        let cutoff = now_millis().saturating_sub(self.stale_after.as_millis() as u64);
        let mut devices = self.devices.write();
        let before = devices.len();
        devices.retain(|_, record| record.last_seen_at >= cutoff);
        let removed = before - devices.len();
        if removed > 0 {
            log::debug!("presence sweep removed {} stale devices", removed);
        }
        removed
    }

    /// Snapshot of the roster, stable order for display
    pub fn roster(&self) -> Vec<DeviceRecord> {
        let mut records: Vec<DeviceRecord> = self.devices.read().values().cloned().collect();
        records.sort_by(|a, b| a.display_name.cmp(&b.display_name).then(a.id.cmp(&b.id)));
        records
    }

    /// Number of devices currently in the roster
    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PresenceTracker {
    fn clone(&self) -> Self {
        Self {
            devices: Arc::clone(&self.devices),
            stale_after: self.stale_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::DeviceRole;

    fn meta(id: &str, name: &str) -> PresenceMeta {
        PresenceMeta {
            device_id: id.to_string(),
            display_name: name.to_string(),
            role: DeviceRole::Viewer,
            online_at: 0,
        }
    }

    #[test]
    fn test_snapshot_fully_replaces_roster() {
        let tracker = PresenceTracker::new();
        tracker.apply_snapshot(&[meta("a", "Headset A"), meta("b", "Headset B")]);
        assert_eq!(tracker.device_count(), 2);

        tracker.apply_snapshot(&[meta("c", "Headset C")]);
        let roster = tracker.roster();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].id, "c");
    }

    #[test]
    fn test_update_patches_or_inserts() {
        let tracker = PresenceTracker::new();

        // Insert when absent, never an error
        let mut record = DeviceRecord::new("a", "Headset A", DeviceRole::Viewer, 0);
        record.battery_level = Some(80);
        tracker.apply_update(&record);
        assert_eq!(tracker.device_count(), 1);

        // Patch the existing entry
        record.battery_level = Some(35);
        record.battery_charging = Some(false);
        tracker.apply_update(&record);

        let roster = tracker.roster();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].battery_level, Some(35));
    }

    #[test]
    fn test_departure_drops_record() {
        let tracker = PresenceTracker::new();
        tracker.apply_update(&DeviceRecord::new("a", "Headset A", DeviceRole::Viewer, 0));
        assert_eq!(tracker.device_count(), 1);

        let mut departed = DeviceRecord::new("a", "Headset A", DeviceRole::Viewer, 0);
        departed.status = ConnectionStatus::Disconnected;
        tracker.apply_update(&departed);
        assert_eq!(tracker.device_count(), 0);

        // Departure of an unknown device is a no-op
        tracker.apply_update(&departed);
        assert_eq!(tracker.device_count(), 0);
    }

    #[test]
    fn test_stale_devices_age_out() {
        let tracker = PresenceTracker::with_stale_after(Duration::from_millis(0));
        tracker.apply_update(&DeviceRecord::new("a", "Headset A", DeviceRole::Viewer, 0));

        // Zero threshold: anything not seen "now" is already stale
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(tracker.sweep_stale(), 1);
        assert_eq!(tracker.device_count(), 0);
    }

    #[test]
    fn test_fresh_devices_survive_sweep() {
        let tracker = PresenceTracker::new();
        tracker.apply_update(&DeviceRecord::new("a", "Headset A", DeviceRole::Viewer, 0));
        assert_eq!(tracker.sweep_stale(), 0);
        assert_eq!(tracker.device_count(), 1);
    }
}
