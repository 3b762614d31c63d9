// ABOUTME: Replicated media library collection
// ABOUTME: Insertion-ordered, deduplicated by item id, commutative add/remove

use crate::protocol::messages::MediaItem;

/// The replicated media library
///
/// Items keep their insertion order for display; membership is keyed by id.
/// Insert and remove are idempotent so deltas can be applied in any order
/// and any number of times.
#[derive(Debug, Default)]
pub struct MediaLibrary {
    items: Vec<MediaItem>,
}

impl MediaLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append an item unless its id is already present
    ///
    /// Returns false on a duplicate id (the existing entry wins).
    pub fn insert(&mut self, item: MediaItem) -> bool {
        if self.contains(&item.id) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Remove an item by id, if present
    pub fn remove(&mut self, id: &str) -> Option<MediaItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    /// Look up an item by id
    pub fn get(&self, id: &str) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Whether an item with this id exists
    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    /// All items in insertion order
    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the library is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{MediaKind, SourceLocator};
    use chrono::Utc;

    fn item(id: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            title: format!("Item {}", id),
            source: SourceLocator::new("https://example.com/a.mp4"),
            kind: MediaKind::Video,
            duration_seconds: 60.0,
            size_bytes: 1024,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_deduplicates_by_id() {
        let mut library = MediaLibrary::new();
        assert!(library.insert(item("a")));
        assert!(!library.insert(item("a")));
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut library = MediaLibrary::new();
        library.insert(item("a"));
        assert!(library.remove("missing").is_none());
        assert_eq!(library.len(), 1);
        assert!(library.remove("a").is_some());
        assert!(library.is_empty());
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut library = MediaLibrary::new();
        library.insert(item("a"));
        library.insert(item("b"));
        library.insert(item("c"));
        library.remove("b");
        let ids: Vec<&str> = library.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
