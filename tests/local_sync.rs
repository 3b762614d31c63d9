use std::sync::Arc;
use viewsync::media::MediaDescriptor;
use viewsync::protocol::messages::{DeviceRole, MediaKind, SourceLocator};
use viewsync::session::{SessionConfig, SyncSession};
use viewsync::transport::{LocalHub, SyncTransport};

fn admin_config() -> SessionConfig {
    SessionConfig::new("Admin Console", DeviceRole::Admin)
}

fn viewer_config(name: &str) -> SessionConfig {
    SessionConfig::new(name, DeviceRole::Viewer)
}

fn portable(title: &str, duration: f64) -> MediaDescriptor {
    MediaDescriptor::from_url(
        title,
        format!("https://example.com/{}.mp4", title),
        MediaKind::Video,
        duration,
        1024,
    )
}

#[tokio::test]
async fn test_late_joiner_bootstraps_to_full_state() {
    let hub = LocalHub::new();
    let admin = SyncSession::start(admin_config().seed_demo_library(true), &hub);

    // The admin has been working for a while before anyone joins
    admin.engine().add_media(portable("briefing", 300.0));
    let target = admin.engine().library()[2].id.clone();
    admin.engine().load_media(&target);
    admin.engine().play();
    admin.engine().seek(42.0);

    let viewer = SyncSession::start(viewer_config("Headset 1"), &hub);

    // Hub delivery is synchronous, so the request-state replay already ran
    assert_eq!(viewer.engine().playback_state(), admin.engine().playback_state());
    assert_eq!(viewer.engine().library().len(), 3);

    viewer.shutdown();
    admin.shutdown();
}

#[tokio::test]
async fn test_live_operations_propagate_to_all_viewers() {
    let hub = LocalHub::new();
    let admin = SyncSession::start(admin_config(), &hub);
    let viewer_a = SyncSession::start(viewer_config("Headset A"), &hub);
    let viewer_b = SyncSession::start(viewer_config("Headset B"), &hub);

    admin.engine().add_media(portable("clip", 120.0));
    let id = admin.engine().library()[0].id.clone();
    admin.engine().load_media(&id);
    admin.engine().play();

    for viewer in [&viewer_a, &viewer_b] {
        let state = viewer.engine().playback_state();
        assert_eq!(state.active_media_id.as_deref(), Some(id.as_str()));
        assert!(state.is_playing);
    }

    admin.engine().remove_media(&id);
    assert!(viewer_a.engine().library().is_empty());
    assert!(viewer_b.engine().library().is_empty());

    viewer_a.shutdown();
    viewer_b.shutdown();
    admin.shutdown();
}

#[tokio::test]
async fn test_local_only_media_stays_local() {
    let hub = LocalHub::new();
    let admin = SyncSession::start(admin_config(), &hub);
    let viewer = SyncSession::start(viewer_config("Headset 1"), &hub);

    let local = MediaDescriptor {
        title: "Screen capture".to_string(),
        locator: SourceLocator::new("file:///tmp/capture.mp4"),
        kind: MediaKind::Video,
        duration_seconds: 0.0,
        size_bytes: 4096,
    };
    let added = admin.engine().add_media(local).unwrap();
    assert!(!added.distributable);

    // Present for the admin, invisible to the viewer
    assert_eq!(admin.engine().library().len(), 1);
    assert!(viewer.engine().library().is_empty());

    // A later joiner's bootstrap must not leak it either
    let late = SyncSession::start(viewer_config("Headset 2"), &hub);
    assert!(late.engine().library().is_empty());

    late.shutdown();
    viewer.shutdown();
    admin.shutdown();
}

#[tokio::test]
async fn test_roster_follows_joins_and_departures() {
    let hub = LocalHub::new();
    let admin = SyncSession::start(admin_config(), &hub);
    let viewer = SyncSession::start(viewer_config("Headset 1"), &hub);

    assert_eq!(admin.tracker().device_count(), 2);
    assert_eq!(viewer.tracker().device_count(), 2);

    viewer.shutdown();
    assert_eq!(admin.tracker().device_count(), 1);

    admin.shutdown();
}

#[tokio::test]
async fn test_torn_down_session_receives_nothing() {
    let hub = LocalHub::new();
    let admin = SyncSession::start(admin_config(), &hub);
    let viewer = SyncSession::start(viewer_config("Headset 1"), &hub);

    admin.engine().add_media(portable("clip", 60.0));
    assert_eq!(viewer.engine().library().len(), 1);

    viewer.shutdown();

    // Anything after teardown must not reach the torn-down replica
    admin.engine().add_media(portable("late", 60.0));
    admin.engine().play();
    assert_eq!(viewer.engine().library().len(), 1);
    assert!(!viewer.engine().playback_state().is_playing);

    admin.shutdown();
}

#[tokio::test]
async fn test_viewer_cannot_drive_the_channel() {
    let hub = LocalHub::new();
    let admin = SyncSession::start(admin_config().seed_demo_library(true), &hub);
    let viewer = SyncSession::start(viewer_config("Headset 1"), &hub);

    viewer.engine().play();
    viewer
        .engine()
        .add_media(portable("rogue", 10.0));

    assert!(!admin.engine().playback_state().is_playing);
    assert_eq!(admin.engine().library().len(), 2);

    viewer.shutdown();
    admin.shutdown();
}

#[tokio::test]
async fn test_detached_transport_is_silent() {
    // A transport handle detached from its hub delivers to no one and
    // accepts sends without erroring
    let hub = LocalHub::new();
    let transport = hub.attach();
    transport.close();

    let admin = SyncSession::start(admin_config(), &hub);
    admin.engine().play();
    admin.shutdown();

    let post_shutdown = SyncSession::start(viewer_config("Headset 1"), &hub);
    assert!(!post_shutdown.engine().playback_state().is_playing);
    post_shutdown.shutdown();
}
