// ABOUTME: Sync engine owning playback state and the media library
// ABOUTME: Authoritative on the admin side, passive reconciler on viewers

mod clock;
mod library;

pub use clock::{now_millis, RevisionClock};
pub use library::MediaLibrary;

use crate::media::MediaDescriptor;
use crate::protocol::messages::{
    DeviceRole, MediaItem, MessageBody, PlaybackState, SyncMessage, VideoRemoved,
};
use crate::transport::SyncTransport;
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;

/// Outcome of adding media to the library
#[derive(Debug, Clone)]
pub struct MediaAdded {
    /// The item as stored in the library
    pub item: MediaItem,
    /// Whether the item was announced to other devices
    ///
    /// False means the source locator is locally scoped: the media plays on
    /// this device but will not sync, and the caller should warn the user.
    pub distributable: bool,
}

/// The playback synchronization engine
///
/// Exactly one participant per channel runs with the admin role; it owns
/// [`PlaybackState`] and the [`MediaLibrary`] and is the only writer.
/// Viewers hold read-only replicas updated through inbound messages:
/// playback state is last-writer-wins on `revision_timestamp`, library
/// deltas are commutative and idempotent by id, so arrival order never
/// matters.
pub struct SyncEngine {
    /// This participant's role
    role: DeviceRole,
    /// Replicated playback state
    state: Arc<RwLock<PlaybackState>>,
    /// Replicated media library
    library: Arc<RwLock<MediaLibrary>>,
    /// Outbound message path
    transport: Arc<dyn SyncTransport>,
    /// Revision stamps for admin mutations
    clock: Arc<RevisionClock>,
}

impl SyncEngine {
    /// Create an engine for the given role, broadcasting on `transport`
    pub fn new(role: DeviceRole, transport: Arc<dyn SyncTransport>) -> Self {
        Self {
            role,
            state: Arc::new(RwLock::new(PlaybackState::default())),
            library: Arc::new(RwLock::new(MediaLibrary::new())),
            transport,
            clock: Arc::new(RevisionClock::new()),
        }
    }

    /// This participant's role
    pub fn role(&self) -> DeviceRole {
        self.role
    }

    fn is_admin(&self) -> bool {
        self.role == DeviceRole::Admin
    }

    /// Snapshot of the current playback state
    pub fn playback_state(&self) -> PlaybackState {
        self.state.read().clone()
    }

    /// Snapshot of the library in insertion order
    pub fn library(&self) -> Vec<MediaItem> {
        self.library.read().items().to_vec()
    }

    /// The item currently loaded for playback, if any
    pub fn active_item(&self) -> Option<MediaItem> {
        let id = self.state.read().active_media_id.clone()?;
        self.library.read().get(&id).cloned()
    }

    /// Start playback (admin only)
    pub fn play(&self) {
        self.mutate_state(|state| state.is_playing = true);
    }

    /// Pause playback (admin only)
    pub fn pause(&self) {
        self.mutate_state(|state| state.is_playing = false);
    }

    /// Seek to a position in seconds, clamped to `[0, duration]` when the
    /// active item's duration is known (admin only)
    pub fn seek(&self, target_seconds: f64) {
        let duration = self
            .active_item()
            .map(|item| item.duration_seconds)
            .filter(|d| *d > 0.0);

        self.mutate_state(move |state| {
            let mut position = target_seconds.max(0.0);
            if let Some(duration) = duration {
                position = position.min(duration);
            }
            state.position_seconds = position;
        });
    }

    /// Load a library item for playback (admin only)
    ///
    /// An unknown id is a silent no-op: the caller may be acting on a stale
    /// library snapshot and the current state must not be clobbered.
    pub fn load_media(&self, media_id: &str) {
        if !self.library.read().contains(media_id) {
            log::debug!("load_media ignored, unknown id {}", media_id);
            return;
        }
        let media_id = media_id.to_string();
        self.mutate_state(move |state| {
            state.active_media_id = Some(media_id);
            state.position_seconds = 0.0;
            state.is_playing = false;
        });
    }

    /// Clear the active item and reset position (admin only)
    pub fn stop(&self) {
        self.mutate_state(|state| {
            state.active_media_id = None;
            state.position_seconds = 0.0;
            state.is_playing = false;
        });
    }

    /// Add media described by `descriptor` to the library (admin only)
    ///
    /// Assigns a fresh id, classifies the locator, and announces the item to
    /// other devices only when the locator is portable. Returns `None` on
    /// viewer-role engines.
    pub fn add_media(&self, descriptor: MediaDescriptor) -> Option<MediaAdded> {
        if !self.is_admin() {
            log::debug!("add_media ignored on viewer role");
            return None;
        }

        let item = MediaItem {
            id: uuid::Uuid::new_v4().to_string(),
            title: descriptor.title,
            source: descriptor.locator,
            kind: descriptor.kind,
            duration_seconds: descriptor.duration_seconds.max(0.0),
            size_bytes: descriptor.size_bytes,
            created_at: Utc::now(),
        };

        let distributable = item.source.is_portable();
        self.library.write().insert(item.clone());

        if distributable {
            self.emit(MessageBody::VideoAdded(item.clone()));
        } else {
            log::warn!(
                "media '{}' has a local-only source, it will not sync to other devices",
                item.title
            );
        }

        Some(MediaAdded {
            item,
            distributable,
        })
    }

    /// Remove a library item by id (admin only, no-op when absent)
    pub fn remove_media(&self, media_id: &str) {
        if !self.is_admin() {
            log::debug!("remove_media ignored on viewer role");
            return;
        }
        if self.library.write().remove(media_id).is_some() {
            self.emit(MessageBody::VideoRemoved(VideoRemoved {
                media_id: media_id.to_string(),
            }));
        }
    }

    /// Insert items into the local library without announcing them
    ///
    /// Startup seeding only (demo library, restored local state); replicated
    /// items always travel as `video-added` deltas.
    pub fn seed_library(&self, items: Vec<MediaItem>) {
        let mut library = self.library.write();
        for item in items {
            library.insert(item);
        }
    }

    /// Ask the admin for the current state (viewer startup)
    ///
    /// The admin replies asynchronously; with no admin present the state
    /// simply stays at defaults, which is not an error.
    pub fn request_state(&self) {
        self.emit(MessageBody::RequestState);
    }

    /// Apply one inbound message
    pub fn handle_message(&self, message: &SyncMessage) {
        match &message.body {
            MessageBody::PlaybackState(incoming) => self.apply_remote_state(incoming),
            MessageBody::VideoAdded(item) => {
                if self.library.write().insert(item.clone()) {
                    log::debug!("library gained '{}' ({})", item.title, item.id);
                }
            }
            MessageBody::VideoRemoved(removed) => {
                if self.library.write().remove(&removed.media_id).is_some() {
                    log::debug!("library dropped {}", removed.media_id);
                }
            }
            MessageBody::RequestState => self.answer_request_state(),
            MessageBody::DeviceUpdate(_) => {
                // Roster updates are the presence tracker's concern
            }
        }
    }

    /// Admin-side mutation: apply, stamp a fresh revision, broadcast
    fn mutate_state<F>(&self, apply: F)
    where
        F: FnOnce(&mut PlaybackState),
    {
        if !self.is_admin() {
            log::debug!("playback mutation ignored on viewer role");
            return;
        }

        let snapshot = {
            let mut state = self.state.write();
            apply(&mut state);
            state.revision_timestamp = self.clock.next();
            state.clone()
        };

        self.emit(MessageBody::PlaybackState(snapshot));
    }

    /// Viewer-side reconciliation: last writer wins on the revision stamp
    fn apply_remote_state(&self, incoming: &PlaybackState) {
        if self.is_admin() {
            // The authoritative owner never accepts replicas
            return;
        }

        let mut state = self.state.write();
        if incoming.revision_timestamp <= state.revision_timestamp {
            log::trace!(
                "discarding stale playback state (revision {} <= {})",
                incoming.revision_timestamp,
                state.revision_timestamp
            );
            return;
        }
        *state = incoming.clone();
    }

    /// Admin reply to `request-state`: the full current state plus one
    /// `video-added` per portable library item, so a new joiner converges
    /// without a separate bootstrap protocol
    fn answer_request_state(&self) {
        if !self.is_admin() {
            return;
        }

        let snapshot = self.state.read().clone();
        self.emit(MessageBody::PlaybackState(snapshot));

        let portable: Vec<MediaItem> = self
            .library
            .read()
            .items()
            .iter()
            .filter(|item| item.source.is_portable())
            .cloned()
            .collect();

        log::debug!("replaying state and {} library items to joiner", portable.len());
        for item in portable {
            self.emit(MessageBody::VideoAdded(item));
        }
    }

    fn emit(&self, body: MessageBody) {
        self.transport.send(&SyncMessage::new(now_millis(), body));
    }
}

impl Clone for SyncEngine {
    fn clone(&self) -> Self {
        Self {
            role: self.role,
            state: Arc::clone(&self.state),
            library: Arc::clone(&self.library),
            transport: Arc::clone(&self.transport),
            clock: Arc::clone(&self.clock),
        }
    }
}
