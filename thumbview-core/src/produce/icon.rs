//! `src/produce/icon.rs`
//! ============================================================================
//! # Shell Icon Producer (Nerd Fonts)
//!
//! Maps a non-image file's extension to a Nerd Font glyph so the listview
//! can render something for entries no thumbnail applies to. No filesystem
//! access is needed beyond the extension; virtual items use the caller's
//! extension hint when one exists.

use std::sync::Arc;

use crate::cache::events::ArtifactKind;
use crate::cache::queue::WorkItem;
use crate::cache::store::Artifact;
use crate::cache::worker::ArtifactProducer;
use crate::error::CoreResult;
use crate::model::item::ItemSource;
use crate::model::virtual_source::VirtualItemSource;

pub const FOLDER_ICON: &str = "\u{f07b}";
pub const FILE_ICON: &str = "\u{f15b}";
pub const SYMLINK_ICON: &str = "\u{f481}";

/// A resolved icon: the glyph plus a stable name for themes and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconGlyph {
    pub glyph: &'static str,
    pub name: &'static str,
}

impl IconGlyph {
    const fn new(glyph: &'static str, name: &'static str) -> Self {
        Self { glyph, name }
    }
}

impl Artifact for IconGlyph {
    fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

/// Glyph for a lower-cased extension; the generic file glyph otherwise.
#[must_use]
pub fn icon_for_extension(ext: Option<&str>) -> IconGlyph {
    match ext {
        Some("rs") => IconGlyph::new("\u{e7a8}", "rust"),
        Some("py") => IconGlyph::new("\u{e73c}", "python"),
        Some("js" | "mjs") => IconGlyph::new("\u{e74e}", "javascript"),
        Some("ts") => IconGlyph::new("\u{e628}", "typescript"),
        Some("c" | "h") => IconGlyph::new("\u{e61e}", "c"),
        Some("cpp" | "cc" | "hpp") => IconGlyph::new("\u{e61d}", "cpp"),
        Some("go") => IconGlyph::new("\u{e626}", "go"),
        Some("java") => IconGlyph::new("\u{e738}", "java"),
        Some("html" | "htm") => IconGlyph::new("\u{e736}", "html"),
        Some("css") => IconGlyph::new("\u{e749}", "css"),
        Some("json") => IconGlyph::new("\u{e60b}", "json"),
        Some("toml" | "yaml" | "yml" | "ini" | "conf") => IconGlyph::new("\u{e615}", "config"),
        Some("md" | "markdown") => IconGlyph::new("\u{f48a}", "markdown"),
        Some("txt" | "log") => IconGlyph::new("\u{f15c}", "text"),
        Some("pdf") => IconGlyph::new("\u{f1c1}", "pdf"),
        Some("zip" | "tar" | "gz" | "xz" | "zst" | "7z" | "rar") => {
            IconGlyph::new("\u{f1c6}", "archive")
        }
        Some("mp3" | "flac" | "ogg" | "wav" | "m4a") => IconGlyph::new("\u{f1c7}", "audio"),
        Some("mp4" | "mkv" | "webm" | "avi" | "mov") => IconGlyph::new("\u{f1c8}", "video"),
        Some("jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "tif" | "tiff") => {
            IconGlyph::new("\u{f1c5}", "image")
        }
        Some("sh" | "bash" | "zsh" | "fish") => IconGlyph::new("\u{f489}", "shell"),
        Some("exe" | "dll" | "so" | "dylib") => IconGlyph::new("\u{f471}", "binary"),
        _ => IconGlyph::new(FILE_ICON, "file"),
    }
}

/// Produces [`IconGlyph`] artifacts on the worker thread.
pub struct IconProducer {
    virtual_source: Option<Arc<dyn VirtualItemSource>>,
}

impl IconProducer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            virtual_source: None,
        }
    }

    /// Attach the resolver used for virtual items' extension hints.
    #[must_use]
    pub fn with_virtual_source(source: Arc<dyn VirtualItemSource>) -> Self {
        Self {
            virtual_source: Some(source),
        }
    }
}

impl Default for IconProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactProducer for IconProducer {
    type Artifact = IconGlyph;

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Icon
    }

    fn produce(&self, job: &WorkItem) -> CoreResult<IconGlyph> {
        let ext = match &job.source {
            ItemSource::Path(_) => job.source.extension(),
            ItemSource::Virtual(key) => self
                .virtual_source
                .as_ref()
                .and_then(|s| s.extension_hint(*key))
                .map(|e| e.to_ascii_lowercase()),
        };

        Ok(icon_for_extension(ext.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::queue::ProduceParams;
    use crate::model::item::ItemId;

    fn job_for(source: ItemSource) -> WorkItem {
        WorkItem {
            id: ItemId::new(),
            source,
            params: ProduceParams::default(),
            generation: 0,
        }
    }

    struct HintSource;

    impl VirtualItemSource for HintSource {
        fn thumbnail(
            &self,
            _key: u64,
            _edge: u32,
        ) -> CoreResult<Option<crate::model::virtual_source::VirtualThumbnail>> {
            Ok(None)
        }

        fn image_bytes(&self, _key: u64) -> CoreResult<Vec<u8>> {
            Ok(Vec::new())
        }

        fn metadata(&self, _key: u64) -> CoreResult<crate::model::virtual_source::VirtualMetadata> {
            unimplemented!("icons never ask for metadata")
        }

        fn extension_hint(&self, _key: u64) -> Option<compact_str::CompactString> {
            Some(compact_str::CompactString::new("RS"))
        }
    }

    #[test]
    fn test_known_extension_maps_to_named_glyph() {
        assert_eq!(icon_for_extension(Some("rs")).name, "rust");
        assert_eq!(icon_for_extension(Some("tar")).name, "archive");
    }

    #[test]
    fn test_unknown_extension_gets_generic_file_glyph() {
        let icon = icon_for_extension(Some("xyzzy"));
        assert_eq!(icon.name, "file");
        assert_eq!(icon.glyph, FILE_ICON);
    }

    #[test]
    fn test_produce_uses_path_extension() {
        let producer = IconProducer::new();
        let icon = producer
            .produce(&job_for(ItemSource::path("/docs/report.PDF")))
            .unwrap();
        assert_eq!(icon.name, "pdf");
    }

    #[test]
    fn test_virtual_hint_is_lowercased_and_mapped() {
        let producer = IconProducer::with_virtual_source(Arc::new(HintSource));
        let icon = producer.produce(&job_for(ItemSource::Virtual(9))).unwrap();
        assert_eq!(icon.name, "rust");
    }

    #[test]
    fn test_virtual_without_hint_is_generic() {
        let producer = IconProducer::new();
        let icon = producer.produce(&job_for(ItemSource::Virtual(5))).unwrap();
        assert_eq!(icon.name, "file");
    }
}
