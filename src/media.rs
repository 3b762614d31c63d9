// ABOUTME: Media ingestion collaborator
// ABOUTME: Builds finished descriptors from files or URLs; the engine never decodes media

use crate::error::Error;
use crate::protocol::messages::{MediaKind, SourceLocator};
use crate::Result;
use std::path::Path;

/// A finished description of media handed to the engine
///
/// Probing (file metadata, kind detection) happens here; the engine only
/// classifies the locator and assigns identity.
#[derive(Debug, Clone)]
pub struct MediaDescriptor {
    /// Human-readable title
    pub title: String,
    /// Where the media can be fetched from
    pub locator: SourceLocator,
    /// Video or still image
    pub kind: MediaKind,
    /// Duration in seconds when known, otherwise 0
    pub duration_seconds: f64,
    /// Size in bytes
    pub size_bytes: u64,
}

impl MediaDescriptor {
    /// Describe media behind a URL with caller-supplied metadata
    pub fn from_url(
        title: impl Into<String>,
        url: impl Into<String>,
        kind: MediaKind,
        duration_seconds: f64,
        size_bytes: u64,
    ) -> Self {
        Self {
            title: title.into(),
            locator: SourceLocator::new(url),
            kind,
            duration_seconds,
            size_bytes,
        }
    }
}

/// Probe a local file into a descriptor
///
/// The size comes from filesystem metadata and the kind from the extension;
/// duration stays 0 because probing it would mean decoding the container.
/// The resulting `file:` locator is local-only by construction, so the
/// engine will keep the item off the wire.
pub fn probe_file(path: impl AsRef<Path>) -> Result<MediaDescriptor> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)
        .map_err(|e| Error::Media(format!("cannot probe {}: {}", path.display(), e)))?;
    if !metadata.is_file() {
        return Err(Error::Media(format!("{} is not a file", path.display())));
    }

    let title = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("Untitled")
        .to_string();

    let locator = SourceLocator::new(format!("file://{}", path.display()));

    Ok(MediaDescriptor {
        title,
        locator,
        kind: kind_from_extension(path),
        duration_seconds: 0.0,
        size_bytes: metadata.len(),
    })
}

/// Derive the media kind from a file extension (videos unless clearly an image)
fn kind_from_extension(path: &Path) -> MediaKind {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") | Some("png") | Some("gif") | Some("webp") | Some("bmp") => {
            MediaKind::Image
        }
        _ => MediaKind::Video,
    }
}

/// The demo library: two well-known sample videos useful for trying the
/// system without uploading anything
pub fn demo_library() -> Vec<MediaDescriptor> {
    vec![
        MediaDescriptor::from_url(
            "Demo Experience",
            "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4",
            MediaKind::Video,
            596.0,
            158_008_374,
        ),
        MediaDescriptor::from_url(
            "Ocean View",
            "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ElephantsDream.mp4",
            MediaKind::Video,
            653.0,
            114_984_274,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(kind_from_extension(Path::new("a.PNG")), MediaKind::Image);
        assert_eq!(kind_from_extension(Path::new("a.jpeg")), MediaKind::Image);
        assert_eq!(kind_from_extension(Path::new("a.mp4")), MediaKind::Video);
        assert_eq!(kind_from_extension(Path::new("noext")), MediaKind::Video);
    }

    #[test]
    fn test_probe_missing_file_errors() {
        let result = probe_file("/definitely/not/here.mp4");
        assert!(matches!(result, Err(Error::Media(_))));
    }

    #[test]
    fn test_probed_file_is_local_only() {
        let dir = std::env::temp_dir();
        let path = dir.join("viewsync-probe-test.mp4");
        std::fs::write(&path, b"not really a video").unwrap();

        let descriptor = probe_file(&path).unwrap();
        assert_eq!(descriptor.title, "viewsync-probe-test");
        assert_eq!(descriptor.kind, MediaKind::Video);
        assert_eq!(descriptor.size_bytes, 18);
        assert!(!descriptor.locator.is_portable());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_demo_library_is_portable() {
        let demos = demo_library();
        assert_eq!(demos.len(), 2);
        assert!(demos.iter().all(|d| d.locator.is_portable()));
    }
}
