//! src/error.rs
//! ============================================================================
//! # `CoreError`: Unified Error Type for the Artifact Caches
//!
//! Production and virtual-callback failures are per-item and never surface
//! from the façade's public operations; they travel over the event channel.
//! The capacity-configuration variant is the single synchronous, caller
//! visible failure (raised directly from the limit setters).

use std::{io, path::PathBuf};

use compact_str::CompactString;
use thiserror::Error;

use crate::model::item::{ItemId, VirtualKey};

/// Convenient alias carrying our unified error type.
pub type CoreResult<T> = Result<T, CoreError>;

/// Unified error type for all cache operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CoreError {
    /// Standard IO error, auto-converted from `io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Decode or read failure while producing an artifact for a real item.
    #[error("Production failed for {path:?}: {message}")]
    Production {
        path: PathBuf,
        message: CompactString,
    },

    /// A caller-supplied virtual-item callback failed or panicked.
    #[error("Virtual callback failed for key {key}: {message}")]
    VirtualCallback {
        key: VirtualKey,
        message: CompactString,
    },

    /// Malformed capacity limit (e.g. an unparseable "20MB" string).
    #[error("Invalid capacity limit {input:?}: {message}")]
    CapacityConfig {
        input: CompactString,
        message: CompactString,
    },

    /// A producer panicked; the panic payload is folded into a message.
    #[error("Producer panicked for item {id}: {message}")]
    ProducerPanic { id: ItemId, message: CompactString },

    /// TOML config parsing error.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Config file I/O error with path.
    #[error("Failed to read config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other error, with description.
    #[error("Unexpected error: {0}")]
    Other(CompactString),
}

impl CoreError {
    /// Create a production failure for a real item.
    pub fn production<P, S>(path: P, message: S) -> Self
    where
        P: Into<PathBuf>,
        S: AsRef<str>,
    {
        Self::Production {
            path: path.into(),
            message: CompactString::new(message.as_ref()),
        }
    }

    /// Create a virtual-callback failure.
    pub fn virtual_callback<S: AsRef<str>>(key: VirtualKey, message: S) -> Self {
        Self::VirtualCallback {
            key,
            message: CompactString::new(message.as_ref()),
        }
    }

    /// Create a capacity-configuration failure.
    pub fn capacity_config<S1, S2>(input: S1, message: S2) -> Self
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        Self::CapacityConfig {
            input: CompactString::new(input.as_ref()),
            message: CompactString::new(message.as_ref()),
        }
    }

    /// True for failures that may succeed on a later attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Production { .. } | Self::VirtualCallback { .. }
        )
    }
}

// Allow conversion from `anyhow::Error` as fallback.
impl From<anyhow::Error> for CoreError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(CompactString::new(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_config_display() {
        let e = CoreError::capacity_config("20XB", "unknown unit");
        let msg = e.to_string();
        assert!(msg.contains("20XB"));
        assert!(msg.contains("unknown unit"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(CoreError::production("/tmp/a.jpg", "truncated").is_retryable());
        assert!(!CoreError::capacity_config("x", "y").is_retryable());
    }
}
