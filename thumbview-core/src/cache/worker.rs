//! `src/cache/worker.rs`
//! ============================================================================
//! # Background Production Worker
//!
//! One dedicated OS thread per cache: dequeue → produce → membership-checked
//! commit → notify. Producers run entirely here, so virtual-item callbacks
//! are invoked off the UI thread.
//!
//! The loop is fatal-error-free by construction: every producer invocation is
//! wrapped, panics included, and folded into a per-item error event.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use compact_str::CompactString;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::cache::events::{ArtifactKind, CacheEvent};
use crate::cache::queue::{WorkItem, WorkQueue};
use crate::cache::store::{Artifact, BoundedStore};
use crate::error::{CoreError, CoreResult};
use crate::model::item::ItemCollection;

/// The single capability a cache is polymorphic over: derive an artifact
/// from a work item. Implementations run on the worker thread and may block.
pub trait ArtifactProducer: Send + Sync + 'static {
    type Artifact: Artifact;

    /// Which cache this producer feeds, for event attribution.
    fn kind(&self) -> ArtifactKind;

    fn produce(&self, job: &WorkItem) -> CoreResult<Self::Artifact>;
}

/// Owned handle to a running worker thread. Shuts the queue down and joins
/// on drop.
pub(crate) struct WorkerHandle {
    queue: Arc<WorkQueue>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub(crate) fn spawn<P: ArtifactProducer>(
        producer: Arc<P>,
        queue: Arc<WorkQueue>,
        store: Arc<BoundedStore<P::Artifact>>,
        items: Arc<ItemCollection>,
        events: UnboundedSender<CacheEvent>,
        retry_on_error: Arc<AtomicBool>,
        generation: Arc<AtomicU64>,
    ) -> Self {
        let kind = producer.kind();
        let worker_queue = Arc::clone(&queue);

        let join = thread::Builder::new()
            .name(format!("thumbview-{kind}"))
            .spawn(move || {
                info!(%kind, "cache worker started");
                worker_loop(
                    producer.as_ref(),
                    &worker_queue,
                    &store,
                    &items,
                    &events,
                    &retry_on_error,
                    &generation,
                );
                info!(%kind, "cache worker stopped");
            })
            .expect("spawning cache worker thread");

        Self {
            queue,
            join: Some(join),
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.queue.shutdown();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn worker_loop<P: ArtifactProducer>(
    producer: &P,
    queue: &WorkQueue,
    store: &BoundedStore<P::Artifact>,
    items: &ItemCollection,
    events: &UnboundedSender<CacheEvent>,
    retry_on_error: &AtomicBool,
    generation: &AtomicU64,
) {
    let kind = producer.kind();

    // Blocks only while the queue is empty; never on the UI.
    while let Some(job) = queue.pop_blocking() {
        let id = job.id;

        if !items.contains(id) || job.generation != generation.load(Ordering::SeqCst) {
            debug!(%kind, item = %id, "job is no longer current, skipping");
            continue;
        }

        // The UI may react (e.g. show a busy marker) on its next turn.
        let _ = events.send(CacheEvent::Started { id, kind });

        let started = Instant::now();
        let outcome = run_producer(producer, &job);
        let load_time = started.elapsed();

        match outcome {
            Ok(artifact) => {
                // Commit only if the identity is still tracked by the owning
                // collection and the job predates no clear/rebuild; a late
                // result for a removed or cleared item is discarded, never
                // resurrected.
                if items.contains(id) && job.generation == generation.load(Ordering::SeqCst) {
                    store.put(id, artifact, job.params, load_time);
                    let _ = events.send(CacheEvent::ArtifactReady { id, kind });
                } else {
                    debug!(%kind, item = %id, "discarding stale result");
                }
            }
            Err(error) => {
                warn!(%kind, item = %id, %error, "production failed");

                if items.contains(id) && job.generation == generation.load(Ordering::SeqCst) {
                    if !retry_on_error.load(Ordering::Relaxed) {
                        // Cache the failure so lookups stop re-triggering
                        // production until remove/rebuild.
                        store.put_failed(id, job.params, load_time);
                    }
                    let _ = events.send(CacheEvent::Error { id, kind, error });
                }
            }
        }
    }
}

/// Invoke the producer with panic isolation. A panicking producer yields a
/// per-item error; it must never take the worker loop down.
fn run_producer<P: ArtifactProducer>(producer: &P, job: &WorkItem) -> CoreResult<P::Artifact> {
    match panic::catch_unwind(AssertUnwindSafe(|| producer.produce(job))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| CompactString::new(s))
                .or_else(|| payload.downcast_ref::<String>().map(CompactString::new))
                .unwrap_or_else(|| CompactString::new("producer panicked"));

            Err(CoreError::ProducerPanic {
                id: job.id,
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::queue::ProduceParams;
    use crate::cache::store::CacheLimit;
    use crate::model::item::{ItemId, ItemSource};

    #[derive(Debug)]
    struct Unit;

    impl Artifact for Unit {
        fn size_bytes(&self) -> usize {
            1
        }
    }

    struct PanickingProducer;

    impl ArtifactProducer for PanickingProducer {
        type Artifact = Unit;

        fn kind(&self) -> ArtifactKind {
            ArtifactKind::Thumbnail
        }

        fn produce(&self, _job: &WorkItem) -> CoreResult<Unit> {
            panic!("decoder exploded");
        }
    }

    fn job(id: ItemId) -> WorkItem {
        WorkItem {
            id,
            source: ItemSource::Virtual(0),
            params: ProduceParams::default(),
            generation: 0,
        }
    }

    #[test]
    fn test_panics_become_per_item_errors() {
        let err = run_producer(&PanickingProducer, &job(ItemId::new())).unwrap_err();
        assert!(matches!(err, CoreError::ProducerPanic { .. }));
        assert!(err.to_string().contains("decoder exploded"));
    }

    #[tokio::test]
    async fn test_worker_survives_panicking_producer() {
        let queue = Arc::new(WorkQueue::new());
        let store = Arc::new(BoundedStore::new(CacheLimit::Items(8)));
        let items = Arc::new(ItemCollection::new());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let retry = Arc::new(AtomicBool::new(false));

        let handle = WorkerHandle::spawn(
            Arc::new(PanickingProducer),
            Arc::clone(&queue),
            Arc::clone(&store),
            Arc::clone(&items),
            tx,
            retry,
            Arc::new(AtomicU64::new(0)),
        );

        let (a, b) = (ItemId::new(), ItemId::new());
        items.insert(a, ItemSource::Virtual(1));
        items.insert(b, ItemSource::Virtual(2));
        queue.enqueue(job(a));
        queue.enqueue(job(b));

        // Two Started + two Error events prove the loop outlived the first
        // panic.
        let mut errors = 0;
        while errors < 2 {
            match rx.recv().await.expect("worker should keep posting events") {
                CacheEvent::Error { .. } => errors += 1,
                CacheEvent::Started { .. } => {}
                CacheEvent::ArtifactReady { .. } => panic!("nothing should succeed"),
            }
        }

        drop(handle);
    }
}
