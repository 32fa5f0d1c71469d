//! `src/cache/facade.rs`
//! ============================================================================
//! # Artifact Cache Façade
//!
//! Public face of one cache: owns the bounded store, the work queue and the
//! worker thread for a single artifact kind. One generic engine, three
//! instantiations — [`ThumbnailCache`], [`MetadataCache`], [`IconCache`] —
//! so eviction and queue logic exist exactly once.
//!
//! All operations are non-blocking for the caller; `get` is a pure lookup
//! and misses are filled in asynchronously via the event channel.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use rustc_hash::FxHashSet;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::cache::events::{ArtifactKind, CacheEvent};
use crate::cache::queue::{ProduceParams, WorkItem, WorkQueue};
use crate::cache::stats::CacheStatsSnapshot;
use crate::cache::store::{BoundedStore, CacheLimit, EntryStatus};
use crate::cache::worker::{ArtifactProducer, WorkerHandle};
use crate::config::parse_memory_limit;
use crate::error::{CoreError, CoreResult};
use crate::model::item::{ItemCollection, ItemId, ItemSource};
use crate::produce::{icon::IconProducer, metadata::MetadataProducer, thumbnail::ThumbnailProducer};

/// Observable façade state. `Rebuilding` lasts from a rebuild call until the
/// work it enqueued has drained, then settles back into `Idle`/`Populating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Idle,
    Populating,
    Rebuilding,
}

/// Bounded asynchronous cache for one artifact kind.
pub struct ArtifactCache<P: ArtifactProducer> {
    kind: ArtifactKind,
    store: Arc<BoundedStore<P::Artifact>>,
    queue: Arc<WorkQueue>,
    items: Arc<ItemCollection>,
    retry_on_error: Arc<AtomicBool>,
    /// Bumped by `clear`/`rebuild`; jobs stamped with an older value are
    /// discarded by the worker at commit time.
    generation: Arc<AtomicU64>,
    rebuilding: AtomicBool,
    _worker: WorkerHandle,
}

impl<P: ArtifactProducer> ArtifactCache<P> {
    /// Build the façade and start its worker thread. Events flow to `events`
    /// and must be drained on the consumer's own thread.
    pub fn new(
        producer: P,
        items: Arc<ItemCollection>,
        events: UnboundedSender<CacheEvent>,
        limit: CacheLimit,
    ) -> Self {
        let kind = producer.kind();
        let store = Arc::new(BoundedStore::new(limit));
        let queue = Arc::new(WorkQueue::new());
        let retry_on_error = Arc::new(AtomicBool::new(false));
        let generation = Arc::new(AtomicU64::new(0));

        let worker = WorkerHandle::spawn(
            Arc::new(producer),
            Arc::clone(&queue),
            Arc::clone(&store),
            Arc::clone(&items),
            events,
            Arc::clone(&retry_on_error),
            Arc::clone(&generation),
        );

        info!(%kind, ?limit, "artifact cache started");

        Self {
            kind,
            store,
            queue,
            items,
            retry_on_error,
            generation,
            rebuilding: AtomicBool::new(false),
            _worker: worker,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Non-blocking lookup. Never triggers production; callers render a
    /// placeholder on `None` and repaint on the `ArtifactReady` event.
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<Arc<P::Artifact>> {
        self.store.get(id)
    }

    /// Request production for an item. Idempotent: already-cached entries
    /// with matching parameters are left alone, and a cached failure is only
    /// retried when retry-on-error is set.
    pub fn add(&self, id: ItemId, source: ItemSource, params: ProduceParams) {
        if let Some(view) = self.store.lookup(id) {
            let fresh = view.params == params;
            match view.status {
                EntryStatus::Ready if fresh => return,
                EntryStatus::Failed if fresh && !self.retry_on_error() => return,
                _ => {}
            }
        }

        self.queue.enqueue(WorkItem {
            id,
            source,
            params,
            generation: self.generation.load(Ordering::SeqCst),
        });
    }

    /// Remove the item's entry and cancel its pending work. A result already
    /// in flight is discarded at commit time via the collection membership
    /// check.
    pub fn remove(&self, id: ItemId) {
        self.queue.cancel(id);
        self.store.remove(id);
    }

    /// Empty store and queue. Bumping the generation makes the worker discard
    /// any in-flight result at commit time, so a cleared cache stays empty.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.queue.clear();
        self.store.clear();
    }

    /// Clear, then re-enqueue production for every item currently in the
    /// owning collection. Used after global parameter changes such as a
    /// thumbnail size change.
    pub fn rebuild(&self, params: ProduceParams) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let work: Vec<WorkItem> = self
            .items
            .snapshot()
            .into_iter()
            .map(|(id, source)| WorkItem {
                id,
                source,
                params,
                generation,
            })
            .collect();

        debug!(kind = %self.kind, queued = work.len(), "rebuilding cache");

        // Raised here, lowered by `state` once the rebuild work has drained.
        self.rebuilding.store(!work.is_empty(), Ordering::SeqCst);
        self.store.clear();
        self.queue.drain_and_rebuild(work);
    }

    /// Move pending work for the visible identities to the front of the
    /// queue; visible rows get their artifacts first.
    pub fn set_visible(&self, visible: &FxHashSet<ItemId>) {
        self.queue.reprioritize(visible);
    }

    /// When true, failed productions are retried on the next reference
    /// instead of being cached as permanently failed.
    pub fn set_retry_on_error(&self, retry: bool) {
        self.retry_on_error.store(retry, Ordering::Relaxed);
    }

    #[must_use]
    pub fn retry_on_error(&self) -> bool {
        self.retry_on_error.load(Ordering::Relaxed)
    }

    /// Bound the store by entry count. Clears any memory limit.
    pub fn set_limit_items(&self, count: usize) -> CoreResult<()> {
        if count == 0 {
            return Err(CoreError::capacity_config(
                "0",
                "item limit must be non-zero",
            ));
        }
        self.store.set_limit(CacheLimit::Items(count));
        Ok(())
    }

    /// Bound the store by artifact memory, from a human-readable string such
    /// as `"20MB"`. Clears any item-count limit. Malformed input is the one
    /// synchronous, caller-visible failure in this module.
    pub fn set_limit_memory(&self, limit: &str) -> CoreResult<()> {
        let limit = parse_memory_limit(limit)?;
        self.store.set_limit(limit);
        Ok(())
    }

    /// Switch to continuous mode: limits are disabled, nothing is ever
    /// evicted, and the entire collection is eagerly enqueued.
    pub fn set_continuous(&self, params: ProduceParams) {
        self.store.set_limit(CacheLimit::Continuous);
        self.rebuild(params);
    }

    #[must_use]
    pub fn limit(&self) -> CacheLimit {
        self.store.limit()
    }

    #[must_use]
    pub fn state(&self) -> CacheState {
        if self.rebuilding.load(Ordering::SeqCst) {
            if !self.queue.is_empty() {
                return CacheState::Rebuilding;
            }
            self.rebuilding.store(false, Ordering::SeqCst);
        }
        if self.queue.is_empty() {
            CacheState::Idle
        } else {
            CacheState::Populating
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Summed bytes of currently-stored artifacts.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.store.total_bytes()
    }

    /// Identities currently stored, in insertion order.
    #[must_use]
    pub fn cached_ids(&self) -> Vec<ItemId> {
        self.store.ids()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.store.stats()
    }
}

impl<P: ArtifactProducer> std::fmt::Debug for ArtifactCache<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCache")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("entries", &self.len())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Thumbnail image cache.
pub type ThumbnailCache = ArtifactCache<ThumbnailProducer>;

/// File-metadata cache.
pub type MetadataCache = ArtifactCache<MetadataProducer>;

/// Shell-icon cache for non-image files.
pub type IconCache = ArtifactCache<IconProducer>;
