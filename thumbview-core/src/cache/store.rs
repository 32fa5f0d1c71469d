//! `src/cache/store.rs`
//! ============================================================================
//! # Bounded Artifact Store
//!
//! Insertion-ordered map from item identity to produced artifact, with
//! admission and eviction governed by one capacity mode at a time.
//!
//! Eviction is FIFO by insertion order, not LRU by access: insertion order is
//! the only information the store retains. Re-scrolling therefore behaves
//! exactly like the listview this store was built for.

use std::{sync::Arc, time::Duration};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::queue::ProduceParams;
use crate::cache::stats::{CacheStats, CacheStatsSnapshot};
use crate::model::item::ItemId;

/// A derived asset held by the store. Byte size feeds memory accounting.
pub trait Artifact: Send + Sync + 'static {
    fn size_bytes(&self) -> usize;
}

/// Capacity policy. Exactly one mode is active at a time; switching modes
/// replaces the previous one wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLimit {
    /// Bounded by entry count.
    Items(usize),

    /// Bounded by summed artifact bytes.
    Memory(u64),

    /// No eviction ever; the store retains every committed artifact.
    Continuous,
}

/// Outcome of a previous production attempt for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Ready,
    Failed,
}

/// Read snapshot of an entry's bookkeeping, used by the façade to decide
/// whether an `add` needs new work.
#[derive(Debug, Clone, Copy)]
pub struct EntryView {
    pub status: EntryStatus,
    pub params: ProduceParams,
}

enum Slot<A> {
    Ready(Arc<A>),
    /// Production failed and retry-on-error was off; kept so repeated lookups
    /// don't re-trigger production.
    Failed,
}

struct CacheEntry<A> {
    slot: Slot<A>,
    bytes: u64,
    params: ProduceParams,
}

struct StoreInner<A> {
    map: IndexMap<ItemId, CacheEntry<A>>,
    limit: CacheLimit,
    total_bytes: u64,
}

impl<A: Artifact> StoreInner<A> {
    /// Evict oldest entries until the configured limit holds.
    /// No-op in continuous mode.
    fn evict_to_fit(&mut self, stats: &CacheStats) {
        loop {
            let over = match self.limit {
                CacheLimit::Continuous => false,
                CacheLimit::Items(max) => self.map.len() > max,
                CacheLimit::Memory(max) => self.total_bytes > max && self.map.len() > 1,
            };
            if !over {
                break;
            }

            // Oldest insertion first. Ownership drops here, not deferred.
            if let Some((id, entry)) = self.map.shift_remove_index(0) {
                self.total_bytes -= entry.bytes;
                stats.record_eviction();
                trace!(item = %id, freed_bytes = entry.bytes, "evicted oldest entry");
            } else {
                break;
            }
        }
    }

    fn remove(&mut self, id: ItemId) -> bool {
        // shift_remove keeps insertion order for the survivors.
        if let Some(entry) = self.map.shift_remove(&id) {
            self.total_bytes -= entry.bytes;
            true
        } else {
            false
        }
    }
}

/// Thread-safe bounded store, shared between one worker and the UI.
///
/// A single lock per store instance; the thumbnail, metadata and icon stores
/// never contend with each other.
pub struct BoundedStore<A> {
    inner: Mutex<StoreInner<A>>,
    stats: CacheStats,
}

impl<A: Artifact> BoundedStore<A> {
    #[must_use]
    pub fn new(limit: CacheLimit) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                map: IndexMap::new(),
                limit,
                total_bytes: 0,
            }),
            stats: CacheStats::default(),
        }
    }

    /// Pure lookup; never triggers production. Failed entries read as absent.
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<Arc<A>> {
        let inner = self.inner.lock();
        match inner.map.get(&id).map(|e| &e.slot) {
            Some(Slot::Ready(artifact)) => {
                self.stats.record_hit();
                Some(Arc::clone(artifact))
            }
            Some(Slot::Failed) | None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Bookkeeping view without touching hit/miss counters.
    #[must_use]
    pub fn lookup(&self, id: ItemId) -> Option<EntryView> {
        let inner = self.inner.lock();
        inner.map.get(&id).map(|e| EntryView {
            status: match e.slot {
                Slot::Ready(_) => EntryStatus::Ready,
                Slot::Failed => EntryStatus::Failed,
            },
            params: e.params,
        })
    }

    /// Insert or replace, then evict oldest entries until within limit.
    /// Eviction is synchronous with the put and never blocks producers on
    /// anything but this store's own lock.
    pub fn put(&self, id: ItemId, artifact: A, params: ProduceParams, load_time: Duration) {
        let bytes = artifact.size_bytes() as u64;
        self.stats.record_production(load_time, true);

        let mut inner = self.inner.lock();
        if let Some(old) = inner.map.insert(
            id,
            CacheEntry {
                slot: Slot::Ready(Arc::new(artifact)),
                bytes,
                params,
            },
        ) {
            inner.total_bytes -= old.bytes;
        }
        inner.total_bytes += bytes;
        inner.evict_to_fit(&self.stats);

        debug!(
            item = %id,
            bytes,
            entries = inner.map.len(),
            total_bytes = inner.total_bytes,
            "committed artifact"
        );
    }

    /// Record a terminal failure so repeated lookups don't re-trigger
    /// production. Skipped entirely when retry-on-error is active.
    pub fn put_failed(&self, id: ItemId, params: ProduceParams, load_time: Duration) {
        self.stats.record_production(load_time, false);

        let mut inner = self.inner.lock();
        if let Some(old) = inner.map.insert(
            id,
            CacheEntry {
                slot: Slot::Failed,
                bytes: 0,
                params,
            },
        ) {
            inner.total_bytes -= old.bytes;
        }
        inner.evict_to_fit(&self.stats);
    }

    /// Synchronous removal, observable immediately by subsequent `get`.
    pub fn remove(&self, id: ItemId) -> bool {
        self.inner.lock().remove(id)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.total_bytes = 0;
    }

    /// Switch capacity mode, evicting immediately if the new limit is
    /// tighter than the current contents.
    pub fn set_limit(&self, limit: CacheLimit) {
        let mut inner = self.inner.lock();
        inner.limit = limit;
        inner.evict_to_fit(&self.stats);
    }

    #[must_use]
    pub fn limit(&self) -> CacheLimit {
        self.inner.lock().limit
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().map.is_empty()
    }

    /// Summed artifact bytes of currently-stored entries only.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.inner.lock().total_bytes
    }

    /// Identities currently stored, in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<ItemId> {
        self.inner.lock().map.keys().copied().collect()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}

impl<A: Artifact> std::fmt::Debug for BoundedStore<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("BoundedStore")
            .field("limit", &inner.limit)
            .field("entries", &inner.map.len())
            .field("total_bytes", &inner.total_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blob(Vec<u8>);

    impl Artifact for Blob {
        fn size_bytes(&self) -> usize {
            self.0.len()
        }
    }

    fn blob(bytes: usize) -> Blob {
        Blob(vec![0u8; bytes])
    }

    fn put(store: &BoundedStore<Blob>, id: ItemId, bytes: usize) {
        store.put(id, blob(bytes), ProduceParams::default(), Duration::ZERO);
    }

    #[test]
    fn test_count_limit_evicts_fifo() {
        let store = BoundedStore::new(CacheLimit::Items(2));
        let (a, b, c) = (ItemId::new(), ItemId::new(), ItemId::new());

        put(&store, a, 10);
        put(&store, b, 10);
        put(&store, c, 10);

        assert_eq!(store.len(), 2);
        assert!(store.get(a).is_none(), "oldest insertion must go first");
        assert!(store.get(b).is_some());
        assert!(store.get(c).is_some());
    }

    #[test]
    fn test_memory_limit_evicts_before_overflow_persists() {
        // 10MB limit, two 6MB artifacts: the second insert evicts the first.
        let store = BoundedStore::new(CacheLimit::Memory(10 * 1024 * 1024));
        let (a, b) = (ItemId::new(), ItemId::new());

        put(&store, a, 6 * 1024 * 1024);
        put(&store, b, 6 * 1024 * 1024);

        assert_eq!(store.len(), 1);
        assert!(store.get(a).is_none());
        assert!(store.get(b).is_some());
        assert_eq!(store.total_bytes(), 6 * 1024 * 1024);
    }

    #[test]
    fn test_oversized_artifact_still_stored_alone() {
        let store = BoundedStore::new(CacheLimit::Memory(1024));
        let id = ItemId::new();

        put(&store, id, 4096);

        // The limit bounds the steady state; a single oversized artifact is
        // kept rather than rejected.
        assert_eq!(store.len(), 1);
        assert!(store.get(id).is_some());
    }

    #[test]
    fn test_continuous_mode_never_evicts() {
        let store = BoundedStore::new(CacheLimit::Continuous);
        let ids: Vec<ItemId> = (0..100).map(|_| ItemId::new()).collect();
        for &id in &ids {
            put(&store, id, 1024);
        }

        assert_eq!(store.len(), 100);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_replace_updates_byte_accounting() {
        let store = BoundedStore::new(CacheLimit::Memory(10_000));
        let id = ItemId::new();

        put(&store, id, 4000);
        put(&store, id, 1000);

        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 1000);
    }

    #[test]
    fn test_failed_entry_reads_as_absent_but_is_tracked() {
        let store: BoundedStore<Blob> = BoundedStore::new(CacheLimit::Items(8));
        let id = ItemId::new();

        store.put_failed(id, ProduceParams::default(), Duration::ZERO);

        assert!(store.get(id).is_none());
        let view = store.lookup(id).unwrap();
        assert_eq!(view.status, EntryStatus::Failed);
    }

    #[test]
    fn test_tightening_limit_evicts_immediately() {
        let store = BoundedStore::new(CacheLimit::Items(4));
        let ids: Vec<ItemId> = (0..4).map(|_| ItemId::new()).collect();
        for &id in &ids {
            put(&store, id, 16);
        }

        store.set_limit(CacheLimit::Items(2));

        assert_eq!(store.len(), 2);
        assert_eq!(store.ids(), vec![ids[2], ids[3]]);
    }

    #[test]
    fn test_remove_and_clear_are_immediate() {
        let store = BoundedStore::new(CacheLimit::Items(8));
        let (a, b) = (ItemId::new(), ItemId::new());
        put(&store, a, 8);
        put(&store, b, 8);

        assert!(store.remove(a));
        assert!(store.get(a).is_none());

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.total_bytes(), 0);
    }
}
