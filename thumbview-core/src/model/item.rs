//! `src/model/item.rs`
//! ============================================================================
//! # Item Identity and Source References
//!
//! Every list entry carries a process-unique `ItemId`, assigned once at
//! creation and never reused. Artifacts (thumbnails, metadata records, icons)
//! are keyed by this id across all three caches.
//!
//! An item's data is reached through its `ItemSource`: either a real
//! filesystem path, or an opaque virtual key resolved through caller
//! callbacks. The caches never touch virtual item storage directly.

use std::{path::PathBuf, sync::Arc};

use compact_str::CompactString;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Process-unique, immutable identity of a list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Mint a fresh identity. Ids are never reused for the process lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short form is enough for log correlation.
        let s = self.0.simple().to_string();
        write!(f, "{}", &s[..8])
    }
}

/// Caller-defined key identifying a virtual item's backing data.
pub type VirtualKey = u64;

/// Where an item's bytes come from.
#[derive(Debug, Clone)]
pub enum ItemSource {
    /// Real item backed by a filesystem path (shared, cheap to clone).
    Path(Arc<PathBuf>),

    /// Virtual item resolved only through [`VirtualItemSource`] callbacks.
    ///
    /// [`VirtualItemSource`]: crate::model::virtual_source::VirtualItemSource
    Virtual(VirtualKey),
}

impl ItemSource {
    /// Convenience constructor for real items.
    pub fn path<P: Into<PathBuf>>(path: P) -> Self {
        Self::Path(Arc::new(path.into()))
    }

    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual(_))
    }

    /// Lower-cased extension for real items, if any.
    #[must_use]
    pub fn extension(&self) -> Option<CompactString> {
        match self {
            Self::Path(p) => p
                .extension()
                .map(|e| CompactString::new(e.to_string_lossy().to_ascii_lowercase())),
            Self::Virtual(_) => None,
        }
    }
}

/// The owning set of live items, shared between the UI and the workers.
///
/// Commit-time membership checks go against this collection, not against any
/// cache store: a result produced for an id that was removed in the meantime
/// is discarded, never resurrected.
#[derive(Debug, Default)]
pub struct ItemCollection {
    inner: DashMap<ItemId, ItemSource>,
}

impl ItemCollection {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Register a live item. Replaces the source if the id is already known.
    pub fn insert(&self, id: ItemId, source: ItemSource) {
        self.inner.insert(id, source);
    }

    /// Drop an item from the collection, returning its source if it was live.
    pub fn remove(&self, id: ItemId) -> Option<ItemSource> {
        self.inner.remove(&id).map(|(_, source)| source)
    }

    /// Membership test used by workers at commit time.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.inner.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<ItemSource> {
        self.inner.get(&id).map(|entry| entry.value().clone())
    }

    /// Stable snapshot of all live items, used by rebuild and continuous mode.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(ItemId, ItemSource)> {
        self.inner
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_ids_are_unique() {
        let a = ItemId::new();
        let b = ItemId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_collection_membership_after_remove() {
        let items = ItemCollection::new();
        let id = ItemId::new();
        items.insert(id, ItemSource::path("/tmp/a.jpg"));
        assert!(items.contains(id));

        items.remove(id);
        assert!(!items.contains(id));
        assert!(items.get(id).is_none());
    }

    #[test]
    fn test_source_extension_lowercased() {
        let src = ItemSource::path("/photos/IMG_0001.JPG");
        assert_eq!(src.extension().as_deref(), Some("jpg"));
        assert!(ItemSource::Virtual(7).extension().is_none());
    }
}
