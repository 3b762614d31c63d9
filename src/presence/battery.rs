// ABOUTME: Battery telemetry as an optional capability
// ABOUTME: Sysfs-backed probe plus a one-shot low-battery advisory monitor

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Charge level at or below which the advisory is raised (percent)
pub const LOW_BATTERY_THRESHOLD: u8 = 40;

/// How often the power source is polled
pub const BATTERY_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// One reading from a device's power source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReading {
    /// Charge percentage, 0-100
    pub level: u8,
    /// Whether the battery is currently charging
    pub charging: bool,
}

/// A device's power-state source
///
/// A capability, not a universal dependency: `read` returns `None` whenever
/// the platform cannot report battery state, and callers simply omit the
/// telemetry fields.
pub trait PowerSource: Send + Sync {
    /// Read the current battery state, if available
    fn read(&self) -> Option<BatteryReading>;
}

/// Power source backed by `/sys/class/power_supply`
pub struct SysfsPowerSource {
    supply_dir: PathBuf,
}

impl SysfsPowerSource {
    /// Probe the platform default location for a battery
    pub fn detect() -> Option<Self> {
        Self::detect_under(Path::new("/sys/class/power_supply"))
    }

    /// Probe for a battery under an arbitrary sysfs-like root
    pub fn detect_under(root: &Path) -> Option<Self> {
        let entries = std::fs::read_dir(root).ok()?;
        for entry in entries.flatten() {
            let dir = entry.path();
            let Ok(kind) = std::fs::read_to_string(dir.join("type")) else {
                continue;
            };
            if kind.trim() == "Battery" {
                return Some(Self { supply_dir: dir });
            }
        }
        None
    }
}

impl PowerSource for SysfsPowerSource {
    fn read(&self) -> Option<BatteryReading> {
        let capacity = std::fs::read_to_string(self.supply_dir.join("capacity")).ok()?;
        let level: u8 = capacity.trim().parse().ok()?;

        let status = std::fs::read_to_string(self.supply_dir.join("status")).ok()?;
        let charging = matches!(status.trim(), "Charging" | "Full");

        Some(BatteryReading {
            level: level.min(100),
            charging,
        })
    }
}

/// Probe the running platform for a power source
pub fn detect_power_source() -> Option<Box<dyn PowerSource>> {
    match SysfsPowerSource::detect() {
        Some(source) => Some(Box::new(source)),
        None => {
            log::debug!("no battery capability detected, telemetry disabled");
            None
        }
    }
}

/// Raised when a threshold crossing is observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryAdvisory {
    /// Charge level at the time of the crossing
    pub level: u8,
}

/// Tracks threshold crossings and raises a one-shot low-battery advisory
///
/// The advisory fires once per crossing and stays latched until the
/// condition no longer holds (recharged above the threshold, or plugged in)
/// or the user dismisses it.
pub struct BatteryMonitor {
    threshold: u8,
    raised: bool,
}

impl BatteryMonitor {
    /// Create a monitor with the default threshold
    pub fn new() -> Self {
        Self::with_threshold(LOW_BATTERY_THRESHOLD)
    }

    /// Create a monitor raising at or below `threshold` percent
    pub fn with_threshold(threshold: u8) -> Self {
        Self {
            threshold,
            raised: false,
        }
    }

    /// Feed one reading; returns an advisory on a fresh threshold crossing
    pub fn observe(&mut self, reading: &BatteryReading) -> Option<BatteryAdvisory> {
        let low = reading.level <= self.threshold && !reading.charging;

        if low && !self.raised {
            self.raised = true;
            log::warn!("battery low: {}%", reading.level);
            return Some(BatteryAdvisory {
                level: reading.level,
            });
        }
        if !low {
            self.raised = false;
        }
        None
    }

    /// Whether the advisory is currently latched
    pub fn is_raised(&self) -> bool {
        self.raised
    }

    /// Dismiss the advisory without waiting for the condition to clear
    pub fn dismiss(&mut self) {
        self.raised = false;
    }
}

impl Default for BatteryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(level: u8, charging: bool) -> BatteryReading {
        BatteryReading { level, charging }
    }

    #[test]
    fn test_advisory_fires_once_per_crossing() {
        let mut monitor = BatteryMonitor::new();

        assert!(monitor.observe(&reading(80, false)).is_none());
        assert_eq!(
            monitor.observe(&reading(35, false)),
            Some(BatteryAdvisory { level: 35 })
        );
        // Still low: latched, no repeat
        assert!(monitor.observe(&reading(30, false)).is_none());
        assert!(monitor.is_raised());
    }

    #[test]
    fn test_advisory_clears_on_recovery() {
        let mut monitor = BatteryMonitor::new();
        monitor.observe(&reading(35, false));

        // Recharged above the threshold clears the latch
        assert!(monitor.observe(&reading(70, false)).is_none());
        assert!(!monitor.is_raised());

        // A second crossing fires again
        assert!(monitor.observe(&reading(20, false)).is_some());
    }

    #[test]
    fn test_charging_suppresses_advisory() {
        let mut monitor = BatteryMonitor::new();
        assert!(monitor.observe(&reading(10, true)).is_none());

        monitor.observe(&reading(10, false));
        assert!(monitor.is_raised());
        // Plugging in clears the latch
        assert!(monitor.observe(&reading(10, true)).is_none());
        assert!(!monitor.is_raised());
    }

    #[test]
    fn test_sysfs_probe_reads_battery() {
        let root = std::env::temp_dir().join("viewsync-power-test");
        let bat = root.join("BAT0");
        std::fs::create_dir_all(&bat).unwrap();
        std::fs::write(bat.join("type"), "Battery\n").unwrap();
        std::fs::write(bat.join("capacity"), "42\n").unwrap();
        std::fs::write(bat.join("status"), "Discharging\n").unwrap();

        let source = SysfsPowerSource::detect_under(&root).expect("battery detected");
        assert_eq!(source.read(), Some(reading(42, false)));

        std::fs::write(bat.join("status"), "Charging\n").unwrap();
        assert_eq!(source.read(), Some(reading(42, true)));

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_missing_capability_is_none_not_error() {
        let root = std::env::temp_dir().join("viewsync-power-missing");
        assert!(SysfsPowerSource::detect_under(&root).is_none());
    }
}
