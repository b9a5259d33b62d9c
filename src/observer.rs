use super::heap::Heap;
use log::debug;

/// Counts produced by one collection.
///
/// Every survivor was marked either while seeding from the roots or while
/// draining the worklist, so `direct_roots + deferred_marks == survivors`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Objects marked directly from the persistent roots and handle stack.
    pub direct_roots: usize,
    /// Objects marked while tracing other objects off the worklist.
    pub deferred_marks: usize,
    /// Objects that survived the sweep.
    pub survivors: usize,
    /// Objects destroyed by the sweep.
    pub reclaimed: usize,
}

/// Hooks invoked around each phase of a collection. All of them default to
/// doing nothing.
///
/// Hooks observe, they must not drive the heap: starting a collection from
/// any hook but `collection_end` panics.
pub trait GcObserver {
    fn collection_start(&self, _heap: &Heap) {}
    fn collection_end(&self, _heap: &Heap, _stats: &GcStats) {}
    fn mark_start(&self, _heap: &Heap) {}
    fn mark_end(&self, _heap: &Heap) {}
    fn sweep_start(&self, _heap: &Heap) {}
    fn sweep_end(&self, _heap: &Heap) {}
}

/// The observer a heap starts with. Reports collections through `log`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl GcObserver for LogObserver {
    fn collection_start(&self, heap: &Heap) {
        debug!(
            "collection started: {} objects, {} bytes since last collection",
            heap.object_count(),
            heap.bytes_since_collection()
        );
    }

    fn collection_end(&self, _heap: &Heap, stats: &GcStats) {
        debug!(
            "collection finished: direct_roots: {}, deferred_marks: {}, survivors: {}, reclaimed: {}",
            stats.direct_roots, stats.deferred_marks, stats.survivors, stats.reclaimed
        );
    }
}
