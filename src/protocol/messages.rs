// ABOUTME: Protocol message type definitions and serialization
// ABOUTME: Supports playback-state, video-added, video-removed, request-state, device-update

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level sync message envelope
///
/// Every message carries a wall-clock `timestamp` in milliseconds next to a
/// tagged body. This is the only vocabulary exchanged between participants;
/// the transport in use never changes the shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncMessage {
    /// Wall-clock emission time in milliseconds
    pub timestamp: u64,
    /// Tagged message body
    #[serde(flatten)]
    pub body: MessageBody,
}

impl SyncMessage {
    /// Create a message stamped with the given emission time
    pub fn new(timestamp: u64, body: MessageBody) -> Self {
        Self { timestamp, body }
    }
}

/// Tagged union over the five message kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum MessageBody {
    /// Full replicated playback state (admin -> viewers)
    PlaybackState(PlaybackState),

    /// A media item was added to the library
    VideoAdded(MediaItem),

    /// A media item was removed from the library
    VideoRemoved(VideoRemoved),

    /// A joining viewer asks the admin for the current state
    RequestState,

    /// Per-device roster update (presence heartbeat, battery telemetry)
    DeviceUpdate(DeviceRecord),
}

/// Replicated playback state, the single source of truth for "what is
/// playing, where, and since when"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Library id of the active media item, if any
    pub active_media_id: Option<String>,
    /// Whether playback is running
    pub is_playing: bool,
    /// Playback position in seconds, never negative
    pub position_seconds: f64,
    /// Last-writer-wins ordering key: strictly increases on every
    /// admin-originated mutation (wall-clock milliseconds)
    pub revision_timestamp: u64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            active_media_id: None,
            is_playing: false,
            position_seconds: 0.0,
            revision_timestamp: 0,
        }
    }
}

/// A media item in the replicated library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    /// Unique item id
    pub id: String,
    /// Human-readable title
    pub title: String,
    /// Where the media can be fetched from
    pub source: SourceLocator,
    /// Video or still image
    pub kind: MediaKind,
    /// Duration in seconds (0 for images and unprobed files)
    pub duration_seconds: f64,
    /// Size in bytes
    pub size_bytes: u64,
    /// When the item was added (ISO-8601 on the wire)
    pub created_at: DateTime<Utc>,
}

/// Kind of media an item refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Moving picture with a duration
    Video,
    /// Still (e.g. panoramic) image
    Image,
}

/// A media source reference
///
/// Locators come in two classes: portable ones any participant can resolve
/// (http/https URLs) and locally-scoped ones that only mean something on the
/// device that created them (`file:` paths, `blob:`/`memory:` handles, bare
/// filesystem paths). The engine must never announce a local-only locator to
/// other devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceLocator(String);

impl SourceLocator {
    /// Wrap a raw locator string
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw locator string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether any participant can resolve this locator, independent of
    /// which device created it
    pub fn is_portable(&self) -> bool {
        match url::Url::parse(&self.0) {
            Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
            // Not a URL at all: a bare filesystem path, local by definition
            Err(_) => false,
        }
    }
}

impl std::fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload of a `video-removed` message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRemoved {
    /// Id of the removed item
    pub media_id: String,
}

/// A participant in the presence roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Opaque process-lifetime device id
    pub id: String,
    /// Human-readable device name
    pub display_name: String,
    /// Admin or viewer
    pub role: DeviceRole,
    /// Current connection status
    pub status: ConnectionStatus,
    /// When the device was last heard from (wall-clock milliseconds)
    pub last_seen_at: u64,
    /// Battery charge percentage, when the device can report one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u8>,
    /// Whether the battery is charging, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_charging: Option<bool>,
}

impl DeviceRecord {
    /// Create a connected record with no battery telemetry
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        role: DeviceRole,
        last_seen_at: u64,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
            status: ConnectionStatus::Connected,
            last_seen_at,
            battery_level: None,
            battery_charging: None,
        }
    }
}

/// Role of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    /// The single role authorized to mutate playback state and the library
    Admin,
    /// A read-only participant replicating playback state
    Viewer,
}

/// Connection status of a roster entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Actively connected
    Connected,
    /// Connected but still converging on current state
    Syncing,
    /// Announced departure; peers drop the record
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tags() {
        let msg = SyncMessage::new(1000, MessageBody::RequestState);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"request-state\""));
        // request-state carries no payload field
        assert!(!json.contains("payload"));

        let state = SyncMessage::new(
            2000,
            MessageBody::PlaybackState(PlaybackState::default()),
        );
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"type\":\"playback-state\""));
        assert!(json.contains("\"timestamp\":2000"));

        let removed = SyncMessage::new(
            3000,
            MessageBody::VideoRemoved(VideoRemoved {
                media_id: "m1".to_string(),
            }),
        );
        let json = serde_json::to_string(&removed).unwrap();
        assert!(json.contains("\"type\":\"video-removed\""));

        let parsed: SyncMessage = serde_json::from_str(&json).unwrap();
        match parsed.body {
            MessageBody::VideoRemoved(payload) => assert_eq!(payload.media_id, "m1"),
            other => panic!("expected video-removed, got {:?}", other),
        }
    }

    #[test]
    fn test_battery_fields_omitted_when_absent() {
        let record = DeviceRecord::new("d1", "Headset 1", DeviceRole::Viewer, 0);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("battery_level"));
        assert!(!json.contains("battery_charging"));

        let mut with_battery = record;
        with_battery.battery_level = Some(35);
        with_battery.battery_charging = Some(false);
        let json = serde_json::to_string(&with_battery).unwrap();
        assert!(json.contains("\"battery_level\":35"));
    }

    #[test]
    fn test_locator_classification() {
        assert!(SourceLocator::new("https://example.com/a.mp4").is_portable());
        assert!(SourceLocator::new("http://10.0.0.5/clip.mp4").is_portable());

        assert!(!SourceLocator::new("file:///tmp/a.mp4").is_portable());
        assert!(!SourceLocator::new("blob:9f8e7d6c").is_portable());
        assert!(!SourceLocator::new("memory:capture-1").is_portable());
        assert!(!SourceLocator::new("/home/user/video.mp4").is_portable());
        assert!(!SourceLocator::new("clip.mp4").is_portable());
    }
}
