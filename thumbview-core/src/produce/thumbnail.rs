//! `src/produce/thumbnail.rs`
//! ============================================================================
//! # Thumbnail Producer
//!
//! Decodes an image (real path or virtual callback), applies EXIF
//! orientation, and resizes it to the requested edge as RGBA8.
//!
//! Embedded previews: many camera files carry a small baked-in JPEG. The
//! `EmbeddedThumbnailPolicy` decides whether that preview may stand in for a
//! full decode — `Always` takes any preview, `Auto` only one at least as
//! large as the requested thumbnail, `Never` skips the scan entirely.

use std::{
    fs::File,
    io::{BufReader, Cursor, Read, Seek},
    path::Path,
    sync::Arc,
};

use image::{
    DynamicImage, ImageDecoder, ImageReader, RgbaImage, imageops::FilterType,
    metadata::Orientation,
};
use tracing::{debug, trace};

use crate::cache::events::ArtifactKind;
use crate::cache::queue::{ProduceParams, WorkItem};
use crate::cache::store::Artifact;
use crate::cache::worker::ArtifactProducer;
use crate::config::EmbeddedThumbnailPolicy;
use crate::error::{CoreError, CoreResult};
use crate::model::item::ItemSource;
use crate::model::virtual_source::VirtualItemSource;

/// How much of a file the embedded-preview scan reads.
const EMBEDDED_SCAN_BYTES: usize = 512 * 1024;

/// Candidate previews smaller than this are noise (marker false positives).
const EMBEDDED_MIN_BYTES: usize = 4 * 1024;

/// Decoded RGBA thumbnail, ready for the UI to upload or blit.
#[derive(Debug, Clone)]
pub struct ThumbnailImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ThumbnailImage {
    fn from_dynamic(image: &DynamicImage) -> Self {
        let rgba: RgbaImage = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            rgba: rgba.into_raw(),
            width,
            height,
        }
    }

    /// Solid fill used by consumers while production is pending or failed.
    #[must_use]
    pub fn solid(edge: u32, rgba: [u8; 4]) -> Self {
        let pixels = (edge as usize) * (edge as usize);
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self {
            rgba: data,
            width: edge,
            height: edge,
        }
    }
}

impl Artifact for ThumbnailImage {
    fn size_bytes(&self) -> usize {
        self.rgba.len() + std::mem::size_of::<Self>()
    }
}

/// Produces [`ThumbnailImage`] artifacts on the worker thread.
pub struct ThumbnailProducer {
    virtual_source: Option<Arc<dyn VirtualItemSource>>,
}

impl ThumbnailProducer {
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

    fn produce_from_path(&self, path: &Path, params: &ProduceParams) -> CoreResult<ThumbnailImage> {
        if params.embedded != EmbeddedThumbnailPolicy::Never
            && let Some(preview) = extract_embedded_preview(path)
            && let Ok(image) = image::load_from_memory(&preview)
        {
            let long_edge = image.width().max(image.height());
            let big_enough = long_edge >= params.target_size;

            if params.embedded == EmbeddedThumbnailPolicy::Always || big_enough {
                trace!(path = %path.display(), long_edge, "using embedded preview");
                // Embedded previews carry their own orientation.
                return Ok(scale(&image, params));
            }
        }

        let file = File::open(path)
            .map_err(|e| CoreError::production(path, format!("open failed: {e}")))?;
        let image = decode_oriented(BufReader::new(file), params)
            .map_err(|e| CoreError::production(path, e.to_string()))?;

        debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "decoded full image"
        );

        Ok(scale(&image, params))
    }

    fn produce_from_virtual(
        &self,
        key: u64,
        params: &ProduceParams,
    ) -> CoreResult<ThumbnailImage> {
        let source = self
            .virtual_source
            .as_ref()
            .ok_or_else(|| CoreError::virtual_callback(key, "no virtual item source registered"))?;

        // The callback's ready-made thumbnail is the virtual analogue of an
        // embedded preview and obeys the same policy.
        if params.embedded != EmbeddedThumbnailPolicy::Never
            && let Some(thumb) = source.thumbnail(key, params.target_size)?
        {
            let expected = (thumb.width as usize) * (thumb.height as usize) * 4;
            if thumb.rgba.len() != expected {
                return Err(CoreError::virtual_callback(
                    key,
                    format!(
                        "callback thumbnail has {} bytes, expected {expected}",
                        thumb.rgba.len()
                    ),
                ));
            }
            return Ok(ThumbnailImage {
                rgba: thumb.rgba,
                width: thumb.width,
                height: thumb.height,
            });
        }

        let bytes = source.image_bytes(key)?;
        let image = decode_oriented(Cursor::new(bytes), params)
            .map_err(|e| CoreError::virtual_callback(key, e.to_string()))?;

        Ok(scale(&image, params))
    }
}

impl Default for ThumbnailProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactProducer for ThumbnailProducer {
    type Artifact = ThumbnailImage;

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Thumbnail
    }

    fn produce(&self, job: &WorkItem) -> CoreResult<ThumbnailImage> {
        match &job.source {
            ItemSource::Path(path) => self.produce_from_path(path, &job.params),
            ItemSource::Virtual(key) => self.produce_from_virtual(*key, &job.params),
        }
    }
}

/// Decode from any seekable reader, honoring EXIF orientation when asked.
fn decode_oriented<R: Read + Seek>(
    reader: R,
    params: &ProduceParams,
) -> image::ImageResult<DynamicImage> {
    let mut decoder = ImageReader::new(BufReader::new(reader))
        .with_guessed_format()?
        .into_decoder()?;

    let orientation = if params.auto_rotate {
        decoder.orientation().unwrap_or(Orientation::NoTransforms)
    } else {
        Orientation::NoTransforms
    };

    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// Aspect-preserving resize to the requested edge.
fn scale(image: &DynamicImage, params: &ProduceParams) -> ThumbnailImage {
    let edge = params.target_size;

    if image.width() <= edge && image.height() <= edge {
        return ThumbnailImage::from_dynamic(image);
    }

    let scaled = if params.fast_decode {
        // Integer box filter; noticeably faster on large sources.
        image.thumbnail(edge, edge)
    } else {
        image.resize(edge, edge, FilterType::Lanczos3)
    };

    ThumbnailImage::from_dynamic(&scaled)
}

/// Scan the head of a file for a baked-in JPEG preview (SOI..EOI pair past
/// the start of the file). Returns the first plausible candidate.
fn extract_embedded_preview(path: &Path) -> Option<Vec<u8>> {
    let mut file = File::open(path).ok()?;
    let mut data = vec![0u8; EMBEDDED_SCAN_BYTES];
    let bytes_read = file.read(&mut data).ok()?;
    data.truncate(bytes_read);

    let soi = [0xFF, 0xD8];
    let eoi = [0xFF, 0xD9];

    // Offset 0 is the container's own stream, not an embedded preview.
    let start = data
        .windows(2)
        .enumerate()
        .skip(1)
        .find(|(_, w)| *w == soi)
        .map(|(i, _)| i)?;

    let end = data[start..]
        .windows(2)
        .position(|w| w == eoi)
        .map(|i| start + i + 2)?;

    if end - start < EMBEDDED_MIN_BYTES {
        return None;
    }

    Some(data[start..end].to_vec())
}
