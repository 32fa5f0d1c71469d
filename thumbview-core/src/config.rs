//! src/config.rs
//! ============================================================================
//! # Config: User-Editable Cache and Thumbnail Settings
//!
//! Loads and saves settings as TOML from the proper cross-platform config
//! path using the [`directories`](https://docs.rs/directories) crate.
//!
//! ## Features
//! - XDG-compliant config discovery and writing (Linux, macOS, Windows)
//! - Robust defaulting if no config file exists
//! - Async load/save for smooth integration with Tokio
//! - Human-readable capacity limits ("20MB", or a plain item count)

use std::{path::PathBuf, str::FromStr};

use bytesize::ByteSize;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::fs as TokioFs;
use tracing::info;

use crate::cache::store::CacheLimit;
use crate::error::{CoreError, CoreResult};

/// Whether thumbnail production may use an embedded preview (the small JPEG
/// many cameras bake into their files) instead of decoding the full image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddedThumbnailPolicy {
    /// Use the embedded preview when it is at least as large as the
    /// requested thumbnail, otherwise decode the full image.
    #[default]
    Auto,

    /// Use the embedded preview whenever one exists, regardless of quality.
    Always,

    /// Always decode the full image.
    Never,
}

/// Thumbnail production settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailOptions {
    /// Requested thumbnail edge (long side), in pixels.
    pub size: u32,

    pub embedded: EmbeddedThumbnailPolicy,

    /// Apply EXIF orientation during production.
    pub auto_rotate: bool,

    /// Prefer decode/resize speed over output quality.
    pub fast_decode: bool,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            size: 160,
            embedded: EmbeddedThumbnailPolicy::Auto,
            auto_rotate: true,
            fast_decode: false,
        }
    }
}

/// Cache capacity and retry settings, shared by all three caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheOptions {
    /// Retry failed productions on the next reference instead of caching
    /// the failure.
    pub retry_on_error: bool,

    /// Maximum entry count. Mutually exclusive with `limit_memory`.
    pub limit_items: Option<usize>,

    /// Maximum artifact memory, as a human-readable string ("20MB").
    /// Mutually exclusive with `limit_items`.
    pub limit_memory: Option<String>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            retry_on_error: false,
            limit_items: Some(512),
            limit_memory: None,
        }
    }
}

impl CacheOptions {
    /// Resolve the configured limit, validating the memory string.
    ///
    /// This is the one place malformed capacity input surfaces synchronously.
    pub fn parse_limit(&self) -> CoreResult<CacheLimit> {
        match (&self.limit_items, &self.limit_memory) {
            (Some(_), Some(mem)) => Err(CoreError::capacity_config(
                mem,
                "limit_items and limit_memory are mutually exclusive",
            )),
            (Some(0), None) => Err(CoreError::capacity_config(
                "0",
                "item limit must be non-zero",
            )),
            (Some(n), None) => Ok(CacheLimit::Items(*n)),
            (None, Some(mem)) => parse_memory_limit(mem),
            (None, None) => Ok(CacheLimit::Continuous),
        }
    }
}

/// Parse a "20MB"-style byte string into a memory limit.
pub fn parse_memory_limit(input: &str) -> CoreResult<CacheLimit> {
    let size = ByteSize::from_str(input.trim())
        .map_err(|e| CoreError::capacity_config(input, e.to_string()))?;

    if size.as_u64() == 0 {
        return Err(CoreError::capacity_config(
            input,
            "memory limit must be non-zero",
        ));
    }

    Ok(CacheLimit::Memory(size.as_u64()))
}

/// Main configuration struct for the caching subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub thumbnails: ThumbnailOptions,

    pub cache: CacheOptions,
}

impl Config {
    /// Loads config from TOML at the XDG-compliant app config dir, or
    /// returns defaults (writing them out for the user to edit).
    pub async fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            info!("Loading config from {}", path.display());
            let text = TokioFs::read_to_string(&path).await?;
            let cfg: Self = toml::from_str(&text)?;

            Ok(cfg)
        } else {
            info!(
                "No config file found at {}, using default configuration. Creating it now.",
                path.display()
            );

            let default_config = Self::default();
            default_config.save().await?;

            Ok(default_config)
        }
    }

    /// Saves config to TOML at the XDG-compliant app config dir.
    pub async fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()?;

        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(&path, toml_str).await?;

        Ok(())
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "thumbview", "ThumbView")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory."))?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}
