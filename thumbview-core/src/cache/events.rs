//! `src/cache/events.rs`
//! ============================================================================
//! # Cache Events: Worker-to-UI Notifications
//!
//! Workers never call into UI state; everything they have to say is posted
//! over an unbounded channel which the UI's event loop drains on its own
//! turn. UI-state mutation therefore stays on the UI's single thread.

use crate::error::CoreError;
use crate::model::item::ItemId;

/// Which of the three caches an event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Thumbnail,
    Metadata,
    Icon,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Thumbnail => write!(f, "thumbnail"),
            Self::Metadata => write!(f, "metadata"),
            Self::Icon => write!(f, "icon"),
        }
    }
}

/// Notification posted by a worker. Consumers typically repaint the item's
/// row on `ArtifactReady` and show the error placeholder on `Error`.
#[derive(Debug)]
pub enum CacheEvent {
    /// Production for this identity is about to start. Cancellation at this
    /// point is expressed by removing the item: the commit-time membership
    /// check then discards the result.
    Started { id: ItemId, kind: ArtifactKind },

    /// The artifact was committed to the store and can be fetched with `get`.
    ArtifactReady { id: ItemId, kind: ArtifactKind },

    /// Production failed. Decode errors, I/O errors and callback failures
    /// are all folded into this one shape.
    Error {
        id: ItemId,
        kind: ArtifactKind,
        error: CoreError,
    },
}

impl CacheEvent {
    #[must_use]
    pub const fn id(&self) -> ItemId {
        match self {
            Self::Started { id, .. } | Self::ArtifactReady { id, .. } | Self::Error { id, .. } => {
                *id
            }
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ArtifactKind {
        match self {
            Self::Started { kind, .. }
            | Self::ArtifactReady { kind, .. }
            | Self::Error { kind, .. } => *kind,
        }
    }
}
