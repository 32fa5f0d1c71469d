//! `src/cache/queue.rs`
//! ============================================================================
//! # Work Queue with Visibility Prioritization
//!
//! Ordered queue of pending production requests. Enqueue is idempotent per
//! item identity so rapid viewport changes cannot grow the queue without
//! bound; reprioritization is a stable partition that drains on-screen items
//! before off-screen ones.
//!
//! The worker blocks here, and only here, while the queue is empty.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::config::{EmbeddedThumbnailPolicy, ThumbnailOptions};
use crate::model::item::{ItemId, ItemSource};

/// Production parameters carried by each work item. A change in parameters
/// (e.g. thumbnail size) makes an existing entry stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProduceParams {
    /// Requested thumbnail edge (long side), in pixels.
    pub target_size: u32,

    pub embedded: EmbeddedThumbnailPolicy,

    /// Apply EXIF orientation during production.
    pub auto_rotate: bool,

    /// Prefer decode/resize speed over output quality.
    pub fast_decode: bool,
}

impl Default for ProduceParams {
    fn default() -> Self {
        Self::from_options(&ThumbnailOptions::default())
    }
}

impl ProduceParams {
    #[must_use]
    pub const fn from_options(opts: &ThumbnailOptions) -> Self {
        Self {
            target_size: opts.size,
            embedded: opts.embedded,
            auto_rotate: opts.auto_rotate,
            fast_decode: opts.fast_decode,
        }
    }
}

/// One pending production request. Consumed exactly once by the worker.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: ItemId,
    pub source: ItemSource,
    pub params: ProduceParams,
    /// Cache generation this job was issued under. `clear` and `rebuild` bump
    /// the generation, so results from jobs issued before them are discarded
    /// at commit time instead of repopulating an emptied store.
    pub generation: u64,
}

struct QueueInner {
    pending: VecDeque<WorkItem>,
    /// Identities currently pending, for O(1) idempotence checks.
    index: FxHashSet<ItemId>,
    shutdown: bool,
}

/// Shared, reorderable queue between the façade (producer side) and one
/// worker (consumer side).
pub struct WorkQueue {
    inner: Mutex<QueueInner>,
    ready: Condvar,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                pending: VecDeque::new(),
                index: FxHashSet::default(),
                shutdown: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Enqueue production work. Idempotent per identity: if work for this id
    /// is already pending, its parameters are replaced in place and its queue
    /// position is kept.
    pub fn enqueue(&self, item: WorkItem) {
        let mut inner = self.inner.lock();

        if inner.index.contains(&item.id) {
            if let Some(existing) = inner.pending.iter_mut().find(|w| w.id == item.id) {
                existing.params = item.params;
                existing.source = item.source;
            }
            trace!(item = %item.id, "pending work updated in place");
            return;
        }

        inner.index.insert(item.id);
        inner.pending.push_back(item);
        drop(inner);
        self.ready.notify_one();
    }

    /// Move pending work for visible identities to the front, preserving
    /// relative order within each partition: `[A,B,C,D]` with visible `{C}`
    /// becomes `[C,A,B,D]`.
    pub fn reprioritize(&self, visible: &FxHashSet<ItemId>) {
        if visible.is_empty() {
            return;
        }

        let mut inner = self.inner.lock();
        if inner.pending.len() < 2 {
            return;
        }

        let mut front: VecDeque<WorkItem> = VecDeque::with_capacity(inner.pending.len());
        let mut rest: VecDeque<WorkItem> = VecDeque::new();

        for item in inner.pending.drain(..) {
            if visible.contains(&item.id) {
                front.push_back(item);
            } else {
                rest.push_back(item);
            }
        }

        front.append(&mut rest);
        inner.pending = front;

        debug!(visible = visible.len(), "queue reprioritized for viewport");
    }

    /// Remove not-yet-started work for this identity. Work already claimed by
    /// the worker is unaffected; its result is discarded at commit time.
    pub fn cancel(&self, id: ItemId) -> bool {
        let mut inner = self.inner.lock();
        if inner.index.remove(&id) {
            inner.pending.retain(|w| w.id != id);
            true
        } else {
            false
        }
    }

    /// Atomically discard all pending work and replace it. In-flight work is
    /// untouched.
    pub fn drain_and_rebuild(&self, items: Vec<WorkItem>) {
        let mut inner = self.inner.lock();
        inner.pending.clear();
        inner.index.clear();

        for item in items {
            if inner.index.insert(item.id) {
                inner.pending.push_back(item);
            }
        }
        let queued = inner.pending.len();
        drop(inner);

        debug!(queued, "queue drained and rebuilt");
        self.ready.notify_one();
    }

    /// Discard all pending work without replacement.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.pending.clear();
        inner.index.clear();
    }

    /// Block until work is available or the queue shuts down. `None` means
    /// shutdown; the worker loop exits on it.
    pub fn pop_blocking(&self) -> Option<WorkItem> {
        let mut inner = self.inner.lock();
        loop {
            if inner.shutdown {
                return None;
            }
            if let Some(item) = inner.pending.pop_front() {
                inner.index.remove(&item.id);
                return Some(item);
            }
            self.ready.wait(&mut inner);
        }
    }

    /// Wake the worker and make every subsequent pop return `None`.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.shutdown = true;
        drop(inner);
        self.ready.notify_all();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().pending.is_empty()
    }

    /// True if work for this identity is still pending.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.inner.lock().index.contains(&id)
    }
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("WorkQueue")
            .field("pending", &inner.pending.len())
            .field("shutdown", &inner.shutdown)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work(id: ItemId) -> WorkItem {
        WorkItem {
            id,
            source: ItemSource::Virtual(0),
            params: ProduceParams::default(),
            generation: 0,
        }
    }

    fn queued_ids(queue: &WorkQueue) -> Vec<ItemId> {
        let mut out = Vec::new();
        while let Some(item) = {
            let mut inner = queue.inner.lock();
            let popped = inner.pending.pop_front();
            if let Some(w) = &popped {
                inner.index.remove(&w.id);
            }
            popped
        } {
            out.push(item.id);
        }
        out
    }

    #[test]
    fn test_enqueue_is_idempotent_per_identity() {
        let queue = WorkQueue::new();
        let id = ItemId::new();

        queue.enqueue(work(id));
        let mut updated = work(id);
        updated.params.target_size = 320;
        queue.enqueue(updated);

        assert_eq!(queue.len(), 1);
        let item = queue.pop_blocking().unwrap();
        assert_eq!(item.params.target_size, 320);
    }

    #[test]
    fn test_reprioritize_is_stable() {
        let queue = WorkQueue::new();
        let ids: Vec<ItemId> = (0..4).map(|_| ItemId::new()).collect();
        for &id in &ids {
            queue.enqueue(work(id));
        }

        // [A,B,C,D] with visible {C} => [C,A,B,D]
        let mut visible = FxHashSet::default();
        visible.insert(ids[2]);
        queue.reprioritize(&visible);

        assert_eq!(queued_ids(&queue), vec![ids[2], ids[0], ids[1], ids[3]]);
    }

    #[test]
    fn test_reprioritize_keeps_order_within_partitions() {
        let queue = WorkQueue::new();
        let ids: Vec<ItemId> = (0..6).map(|_| ItemId::new()).collect();
        for &id in &ids {
            queue.enqueue(work(id));
        }

        let mut visible = FxHashSet::default();
        visible.insert(ids[1]);
        visible.insert(ids[4]);
        queue.reprioritize(&visible);

        assert_eq!(
            queued_ids(&queue),
            vec![ids[1], ids[4], ids[0], ids[2], ids[3], ids[5]]
        );
    }

    #[test]
    fn test_cancel_removes_pending_only() {
        let queue = WorkQueue::new();
        let (a, b) = (ItemId::new(), ItemId::new());
        queue.enqueue(work(a));
        queue.enqueue(work(b));

        assert!(queue.cancel(a));
        assert!(!queue.cancel(a));
        assert_eq!(queued_ids(&queue), vec![b]);
    }

    #[test]
    fn test_drain_and_rebuild_replaces_pending() {
        let queue = WorkQueue::new();
        for _ in 0..3 {
            queue.enqueue(work(ItemId::new()));
        }

        let fresh: Vec<ItemId> = (0..2).map(|_| ItemId::new()).collect();
        queue.drain_and_rebuild(fresh.iter().map(|&id| work(id)).collect());

        assert_eq!(queued_ids(&queue), fresh);
    }

    #[test]
    fn test_shutdown_unblocks_pop() {
        let queue = std::sync::Arc::new(WorkQueue::new());
        let q = std::sync::Arc::clone(&queue);
        let handle = std::thread::spawn(move || q.pop_blocking());

        queue.shutdown();
        assert!(handle.join().unwrap().is_none());
    }
}
