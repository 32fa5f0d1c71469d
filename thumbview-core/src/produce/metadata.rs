//! `src/produce/metadata.rs`
//! ============================================================================
//! # Metadata Producer
//!
//! Reads the file attributes a listview column set needs: name, byte size,
//! modification time, kind, extension, and pixel dimensions when the image
//! header yields them cheaply. Virtual items resolve through the caller's
//! metadata callback.

use std::{fs, path::Path, sync::Arc, time::SystemTime};

use bytesize::ByteSize;
use chrono::{DateTime, Local};
use compact_str::{CompactString, ToCompactString};
use tracing::trace;

use crate::cache::events::ArtifactKind;
use crate::cache::queue::WorkItem;
use crate::cache::store::Artifact;
use crate::cache::worker::ArtifactProducer;
use crate::error::{CoreError, CoreResult};
use crate::model::item::ItemSource;
use crate::model::virtual_source::VirtualItemSource;

/// Extensions worth probing for pixel dimensions. Reading the header is
/// cheap for these formats; everything else is skipped outright.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff", "ico", "qoi",
];

/// Metadata record for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub name: CompactString,

    /// Byte length of the underlying data.
    pub byte_size: u64,

    pub modified: Option<SystemTime>,

    /// Lower-case extension, if any.
    pub extension: Option<CompactString>,

    pub is_dir: bool,
    pub is_symlink: bool,

    /// Pixel dimensions, when the image header was cheap to read.
    pub dimensions: Option<(u32, u32)>,
}

impl FileMetadata {
    /// "1.4 MB"-style display size.
    #[must_use]
    pub fn format_size(&self) -> String {
        ByteSize(self.byte_size).to_string()
    }

    /// Format the modification date with a chrono pattern, empty if unknown.
    #[must_use]
    pub fn format_date(&self, fmt: &str) -> String {
        self.modified.map_or_else(String::new, |t| {
            let dt: DateTime<Local> = t.into();
            dt.format(fmt).to_string()
        })
    }

    /// "640 x 480" or empty if dimensions are unknown.
    #[must_use]
    pub fn format_dimensions(&self) -> String {
        self.dimensions
            .map_or_else(String::new, |(w, h)| format!("{w} x {h}"))
    }
}

impl Artifact for FileMetadata {
    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.name.len()
            + self.extension.as_ref().map_or(0, CompactString::len)
    }
}

/// Produces [`FileMetadata`] artifacts on the worker thread.
pub struct MetadataProducer {
    virtual_source: Option<Arc<dyn VirtualItemSource>>,
}

impl MetadataProducer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            virtual_source: None,
        }
    }

    /// Attach the resolver for virtual items. Its callbacks run on the
    /// worker thread.
    #[must_use]
    pub fn with_virtual_source(source: Arc<dyn VirtualItemSource>) -> Self {
        Self {
            virtual_source: Some(source),
        }
    }

    fn produce_from_path(path: &Path) -> CoreResult<FileMetadata> {
        let meta = fs::symlink_metadata(path)
            .map_err(|e| CoreError::production(path, format!("stat failed: {e}")))?;

        let name = path
            .file_name()
            .map_or_else(|| path.to_string_lossy().to_compact_string(), |n| {
                n.to_string_lossy().to_compact_string()
            });

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase().to_compact_string());

        let dimensions = extension
            .as_deref()
            .filter(|ext| IMAGE_EXTENSIONS.contains(ext))
            .and_then(|_| image::image_dimensions(path).ok());

        trace!(path = %path.display(), size = meta.len(), "metadata read");

        Ok(FileMetadata {
            name,
            byte_size: meta.len(),
            modified: meta.modified().ok(),
            extension,
            is_dir: meta.is_dir(),
            is_symlink: meta.file_type().is_symlink(),
            dimensions,
        })
    }

    fn produce_from_virtual(&self, key: u64) -> CoreResult<FileMetadata> {
        let source = self
            .virtual_source
            .as_ref()
            .ok_or_else(|| CoreError::virtual_callback(key, "no virtual item source registered"))?;

        let meta = source.metadata(key)?;

        Ok(FileMetadata {
            name: meta.name,
            byte_size: meta.byte_size,
            modified: meta.modified,
            extension: meta.extension,
            is_dir: false,
            is_symlink: false,
            dimensions: meta.dimensions,
        })
    }
}

impl Default for MetadataProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactProducer for MetadataProducer {
    type Artifact = FileMetadata;

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Metadata
    }

    fn produce(&self, job: &WorkItem) -> CoreResult<FileMetadata> {
        match &job.source {
            ItemSource::Path(path) => Self::produce_from_path(path),
            ItemSource::Virtual(key) => self.produce_from_virtual(*key),
        }
    }
}
