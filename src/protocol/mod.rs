// ABOUTME: Protocol module for viewsync
// ABOUTME: Wire-level message vocabulary and relay channel framing

/// Sync message vocabulary and replicated data types
pub mod messages;
/// Relay channel framing (broadcast + presence primitives)
pub mod relay;

pub use messages::{
    ConnectionStatus, DeviceRecord, DeviceRole, MediaItem, MediaKind, MessageBody, PlaybackState,
    SourceLocator, SyncMessage, VideoRemoved,
};
pub use relay::{PresenceMeta, RelayFrame};
