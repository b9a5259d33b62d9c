use super::observer::GcStats;
use std::cell::Cell;

/// A 'snapshot' of the heap's counters.
///
/// Obtained by calling [`crate::Heap::metrics`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GcMetrics {
    /// Number of collections that have completed.
    pub collections: u64,

    /// Objects currently owned by the heap.
    pub live_objects: usize,

    /// Registered persistent roots.
    pub roots: usize,

    /// Slots on the handle stack.
    pub handles: usize,

    /// Scopes currently open.
    pub open_scopes: usize,

    /// Bytes counted toward the next automatic collection.
    pub bytes_since_collection: usize,

    /// Running totals since the heap was created.
    pub objects_allocated: u64,
    pub objects_reclaimed: u64,
    pub bytes_allocated: u64,

    /// Stats of the most recent collection.
    pub last_collection: Option<GcStats>,
}

pub(crate) struct Metrics {
    collections: Cell<u64>,
    objects_allocated: Cell<u64>,
    objects_reclaimed: Cell<u64>,
    bytes_allocated: Cell<u64>,
    last_collection: Cell<Option<GcStats>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            collections: Cell::new(0),
            objects_allocated: Cell::new(0),
            objects_reclaimed: Cell::new(0),
            bytes_allocated: Cell::new(0),
            last_collection: Cell::new(None),
        }
    }

    pub fn record_alloc(&self, size: usize) {
        self.objects_allocated.set(self.objects_allocated.get() + 1);
        self.bytes_allocated.set(self.bytes_allocated.get() + size as u64);
    }

    pub fn record_collection(&self, stats: GcStats) {
        self.collections.set(self.collections.get() + 1);
        self.objects_reclaimed
            .set(self.objects_reclaimed.get() + stats.reclaimed as u64);
        self.last_collection.set(Some(stats));
    }

    pub fn collections(&self) -> u64 {
        self.collections.get()
    }

    /// Fills in the cumulative fields of `metrics`.
    pub fn snapshot(&self, metrics: GcMetrics) -> GcMetrics {
        GcMetrics {
            collections: self.collections.get(),
            objects_allocated: self.objects_allocated.get(),
            objects_reclaimed: self.objects_reclaimed.get(),
            bytes_allocated: self.bytes_allocated.get(),
            last_collection: self.last_collection.get(),
            ..metrics
        }
    }
}
