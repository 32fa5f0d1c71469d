//! `src/model/virtual_source.rs`
//! ============================================================================
//! # Virtual Item Callbacks
//!
//! Virtual items have no filesystem path; their data lives in caller-owned
//! storage and is reached through this trait. The caches hold only the
//! [`VirtualKey`], never the caller's objects.
//!
//! All callbacks are invoked on a cache worker thread, never on the UI
//! thread. Implementations must be reentrant-safe or externally synchronized.

use std::time::SystemTime;

use compact_str::CompactString;

use crate::error::CoreResult;
use crate::model::item::VirtualKey;

/// Pre-decoded RGBA thumbnail returned by a virtual source.
#[derive(Debug, Clone)]
pub struct VirtualThumbnail {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Metadata fields a virtual source reports for one of its items.
#[derive(Debug, Clone)]
pub struct VirtualMetadata {
    pub name: CompactString,
    pub byte_size: u64,
    pub modified: Option<SystemTime>,
    pub extension: Option<CompactString>,
    /// Pixel dimensions, when the source knows them cheaply.
    pub dimensions: Option<(u32, u32)>,
}

/// Resolver for virtual items, implemented by the item-source collaborator.
pub trait VirtualItemSource: Send + Sync {
    /// Return a ready-made thumbnail no smaller than `edge` on its long side,
    /// or `Ok(None)` if the source has none for this key (the cache then
    /// falls back to [`image_bytes`](Self::image_bytes)).
    fn thumbnail(&self, key: VirtualKey, edge: u32) -> CoreResult<Option<VirtualThumbnail>>;

    /// Return the full encoded image bytes for this key.
    fn image_bytes(&self, key: VirtualKey) -> CoreResult<Vec<u8>>;

    /// Return metadata fields for this key.
    fn metadata(&self, key: VirtualKey) -> CoreResult<VirtualMetadata>;

    /// Optional extension hint used for icon selection. Defaults to none,
    /// which yields the generic file glyph.
    fn extension_hint(&self, key: VirtualKey) -> Option<CompactString> {
        let _ = key;
        None
    }
}
