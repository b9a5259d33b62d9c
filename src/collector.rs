use super::heap::Heap;
use super::observer::GcStats;
use super::trace::{TraceJob, Tracer};

use log::{debug, warn};
use std::cell::{Cell, RefCell};

/// The phase a heap's collector is in.
///
/// A collection walks `Idle -> SeedRoots -> Mark -> Sweep -> Idle` and always
/// runs to completion once started.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GcState {
    Idle,
    SeedRoots,
    Mark,
    Sweep,
}

pub(crate) struct Collector {
    state: Cell<GcState>,
    // kept between collections to reuse its capacity
    work: RefCell<Vec<TraceJob>>,
}

impl Collector {
    pub fn new() -> Self {
        Self {
            state: Cell::new(GcState::Idle),
            work: RefCell::new(Vec::new()),
        }
    }

    pub fn state(&self) -> GcState {
        self.state.get()
    }

    pub fn collect(&self, heap: &Heap) -> GcStats {
        assert_eq!(
            self.state(),
            GcState::Idle,
            "Attempted to start a collection while one is running"
        );

        let observer = heap.observer();
        let mut stats = GcStats::default();

        self.state.set(GcState::SeedRoots);

        let _guard = UnwindGuard {
            collector: self,
            heap,
        };

        observer.collection_start(heap);
        observer.mark_start(heap);

        {
            let live = heap.chain().live();
            let mut tracer = Tracer::new(&live, self.work.take());

            heap.for_each_root(|slot| {
                tracer.mark(slot);
            });
            stats.direct_roots = tracer.take_mark_count();

            self.state.set(GcState::Mark);
            tracer.trace_loop();
            stats.deferred_marks = tracer.take_mark_count();

            *self.work.borrow_mut() = tracer.into_work();
        }

        observer.mark_end(heap);

        self.state.set(GcState::Sweep);
        observer.sweep_start(heap);

        let (survivors, reclaimed) = heap.chain().sweep();
        stats.survivors = survivors;
        stats.reclaimed = reclaimed;

        observer.sweep_end(heap);
        self.state.set(GcState::Idle);

        debug_assert_eq!(stats.direct_roots + stats.deferred_marks, stats.survivors);
        debug!("collection stats: {:?}", stats);

        heap.record_collection(stats);
        observer.collection_end(heap, &stats);

        stats
    }
}

// Puts the heap back into a collectable state when a cycle unwinds out of a
// trace impl, an observer hook or a destructor.
struct UnwindGuard<'a> {
    collector: &'a Collector,
    heap: &'a Heap,
}

impl<'a> Drop for UnwindGuard<'a> {
    fn drop(&mut self) {
        let state = self.collector.state();

        if state == GcState::Idle {
            return;
        }

        warn!("collection abandoned during {:?}", state);

        self.heap.chain().clear_marks();
        self.collector.state.set(GcState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Gc, GcObserver, Trace};
    use std::cell::Cell;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::rc::Rc;

    #[derive(Trace)]
    struct Pair {
        left: Cell<Option<Gc<Pair>>>,
        right: Cell<Option<Gc<Pair>>>,
    }

    impl Pair {
        fn new() -> Self {
            Self {
                left: Cell::new(None),
                right: Cell::new(None),
            }
        }
    }

    #[test]
    fn marking_twice_enqueues_once() {
        let heap = Heap::new();

        heap.scope(|s| {
            let pair = s.alloc(Pair::new()).unwrap();
            let live = heap.chain().live();
            let mut tracer = Tracer::new(&live, Vec::new());

            tracer.trace(pair.gc());
            tracer.trace(pair.gc());

            assert_eq!(tracer.pending(), 1);
            assert_eq!(tracer.take_mark_count(), 1);

            tracer.trace_loop();
            assert_eq!(tracer.pending(), 0);
            drop(tracer.into_work());

            // leave the heap as a fresh cycle expects it
            unsafe { pair.gc().header().as_ref().unmark() };
        });

        assert_eq!(heap.collect().reclaimed, 1);
    }

    #[test]
    fn leaves_are_never_queued() {
        let heap = Heap::new();

        heap.scope(|s| {
            let leaf = s.alloc(42usize).unwrap();
            let live = heap.chain().live();
            let mut tracer = Tracer::new(&live, Vec::new());

            tracer.trace(leaf.gc());

            assert_eq!(tracer.pending(), 0);
            assert_eq!(tracer.take_mark_count(), 1);

            unsafe { leaf.gc().header().as_ref().unmark() };
        });
    }

    #[test]
    fn marks_are_cleared_after_collection() {
        let heap = Heap::new();

        heap.scope(|s| {
            let a = s.alloc(Pair::new()).unwrap();
            let b = s.alloc(Pair::new()).unwrap();

            a.left.set(Some(b.gc()));
            heap.collect();

            unsafe {
                assert!(!a.gc().header().as_ref().is_marked());
                assert!(!b.gc().header().as_ref().is_marked());
            }

            assert_eq!(heap.state(), GcState::Idle);
        });
    }

    #[test]
    fn stats_split_direct_and_deferred() {
        let heap = Heap::new();

        heap.scope(|s| {
            let a = s.alloc(Pair::new()).unwrap();

            s.nested(|inner| {
                let b = inner.alloc(Pair::new()).unwrap();
                let c = inner.alloc(Pair::new()).unwrap();

                a.left.set(Some(b.gc()));
                b.right.set(Some(c.gc()));
            });

            let stats = heap.collect();

            assert_eq!(stats.direct_roots, 1);
            assert_eq!(stats.deferred_marks, 2);
            assert_eq!(stats.survivors, 3);
            assert_eq!(stats.reclaimed, 0);
        });
    }

    #[test]
    fn collecting_with_no_objects() {
        let heap = Heap::new();

        assert_eq!(heap.collect(), GcStats::default());
        assert_eq!(heap.metrics().collections, 1);
    }

    struct FailingObserver;

    impl GcObserver for FailingObserver {
        fn mark_end(&self, _: &Heap) {
            panic!("observer failure");
        }
    }

    #[test]
    fn unwinding_collection_leaves_heap_usable() {
        let heap = Heap::new();

        heap.scope(|s| {
            let a = s.alloc(Pair::new()).unwrap();
            let b = s.alloc(Pair::new()).unwrap();

            a.left.set(Some(b.gc()));

            let previous = heap.set_observer(Rc::new(FailingObserver));
            let result = catch_unwind(AssertUnwindSafe(|| heap.collect()));

            assert!(result.is_err());
            assert_eq!(heap.state(), GcState::Idle);

            unsafe {
                assert!(!a.gc().header().as_ref().is_marked());
                assert!(!b.gc().header().as_ref().is_marked());
            }

            heap.set_observer(previous);

            let stats = heap.collect();

            assert_eq!(stats.survivors, 2);
            assert_eq!(stats.reclaimed, 0);
        });
    }
}
