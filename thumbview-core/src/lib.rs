pub mod error;

pub mod config;

pub mod logging;

pub mod model {
    pub mod item;
    pub use item::{ItemCollection, ItemId, ItemSource, VirtualKey};

    pub mod virtual_source;
    pub use virtual_source::{VirtualItemSource, VirtualMetadata, VirtualThumbnail};
}

pub mod cache {
    pub mod events;
    pub use events::{ArtifactKind, CacheEvent};

    pub mod facade;
    pub use facade::{ArtifactCache, CacheState, IconCache, MetadataCache, ThumbnailCache};

    pub mod queue;
    pub use queue::{ProduceParams, WorkItem, WorkQueue};

    pub mod stats;
    pub use stats::{CacheStats, CacheStatsSnapshot};

    pub mod store;
    pub use store::{Artifact, BoundedStore, CacheLimit};

    pub mod worker;
    pub use worker::ArtifactProducer;
}

pub mod produce {
    pub mod icon;
    pub use icon::{IconGlyph, IconProducer};

    pub mod metadata;
    pub use metadata::{FileMetadata, MetadataProducer};

    pub mod thumbnail;
    pub use thumbnail::{ThumbnailImage, ThumbnailProducer};
}

pub use cache::{ArtifactCache, ArtifactKind, CacheEvent, CacheLimit, CacheState};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use model::{ItemCollection, ItemId, ItemSource};
