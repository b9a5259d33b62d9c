use super::allocator::{Allocator, ObjectChain};
use super::collector::{Collector, GcState};
use super::config::GcConfig;
use super::error::GcResult;
use super::gc::Gc;
use super::header::GcHeader;
use super::metrics::{GcMetrics, Metrics};
use super::observer::{GcObserver, GcStats, LogObserver};
use super::root::{RootId, RootList};
use super::trace::Trace;

use log::debug;
use std::alloc::Layout;
use std::cell::{Cell, RefCell};
use std::ptr::NonNull;
use std::rc::Rc;

type Slot = Option<NonNull<GcHeader>>;

/// A garbage collected heap.
///
/// Objects are allocated through the scopes of a heap (see [`Heap::scope`])
/// and are freed by a mark and sweep collection once they are no longer
/// reachable from an open scope's handles or from a [`crate::Root`].
/// Collections run when [`Heap::collect`] is called, or automatically from
/// an allocation once [`GcConfig::collect_threshold`] bytes have been
/// allocated since the previous one.
///
/// A heap serves a single thread. Dropping it destroys every object it
/// still owns.
pub struct Heap {
    config: GcConfig,
    allocator: Allocator,
    chain: ObjectChain,
    collector: Collector,
    stack: RefCell<Vec<Slot>>,
    depth: Cell<usize>,
    roots: RefCell<RootList>,
    observer: RefCell<Rc<dyn GcObserver>>,
    metrics: Metrics,
}

impl Heap {
    pub fn new() -> Self {
        Self::with_config(GcConfig::default())
    }

    pub fn with_config(config: GcConfig) -> Self {
        Self {
            config,
            allocator: Allocator::new(&config),
            chain: ObjectChain::new(),
            collector: Collector::new(),
            stack: RefCell::new(Vec::new()),
            depth: Cell::new(0),
            roots: RefCell::new(RootList::new()),
            observer: RefCell::new(Rc::new(LogObserver)),
            metrics: Metrics::new(),
        }
    }

    /// Synchronously runs a full collection.
    ///
    /// # Panics
    /// If a collection is already running on this heap.
    pub fn collect(&self) -> GcStats {
        self.collector.collect(self)
    }

    pub fn config(&self) -> GcConfig {
        self.config
    }

    pub fn state(&self) -> GcState {
        self.collector.state()
    }

    pub fn object_count(&self) -> usize {
        self.chain.len()
    }

    pub fn bytes_since_collection(&self) -> usize {
        self.allocator.allocated()
    }

    /// Installs `observer`, returning the one it replaces.
    pub fn set_observer(&self, observer: Rc<dyn GcObserver>) -> Rc<dyn GcObserver> {
        self.observer.replace(observer)
    }

    pub fn observer(&self) -> Rc<dyn GcObserver> {
        self.observer.borrow().clone()
    }

    pub fn metrics(&self) -> GcMetrics {
        self.metrics.snapshot(GcMetrics {
            live_objects: self.chain.len(),
            roots: self.roots.borrow().len(),
            handles: self.stack.borrow().len(),
            open_scopes: self.depth.get(),
            bytes_since_collection: self.allocator.allocated(),
            ..GcMetrics::default()
        })
    }

    /// Counts `layout` toward the collection threshold, collecting first if
    /// it is reached, then returns zeroed memory. The memory is not visible
    /// to the collection it may trigger.
    pub(crate) fn allocate(&self, layout: Layout) -> GcResult<NonNull<u8>> {
        assert_eq!(
            self.state(),
            GcState::Idle,
            "Attempted to allocate during a collection"
        );

        if self.allocator.record(layout.size()) {
            debug!(
                "allocation threshold of {} bytes reached",
                self.config.collect_threshold
            );

            self.collect();
            self.allocator.reset();
        }

        let ptr = Allocator::alloc(layout)?;

        self.metrics.record_alloc(layout.size());

        Ok(ptr)
    }

    pub(crate) fn alloc_object<T: Trace>(&self, depth: usize, value: T) -> GcResult<Gc<T>> {
        self.assert_innermost(depth);

        let layout = GcHeader::alloc_layout::<T>()?;
        let ptr = self.allocate(layout)?.cast::<GcHeader>();

        unsafe {
            ptr.as_ptr().write(GcHeader::new::<T>());
            GcHeader::object::<T>(ptr).as_ptr().write(value);
        }

        // handle stack first, then the chain
        self.push_local(depth, Some(ptr));
        self.chain.register(ptr, !T::IS_LEAF);

        Ok(unsafe { Gc::from_nonnull(GcHeader::object::<T>(ptr)) })
    }

    /// # Panics
    /// If `gc` is not a live `T` of this heap.
    pub(crate) fn assert_owns<T: Trace>(&self, gc: Gc<T>) {
        let header = gc.header();

        assert!(
            self.chain.contains(header),
            "Attempted to use a Gc that is not a live object of this heap"
        );
        assert!(
            unsafe { header.as_ref() }.holds::<T>(),
            "Attempted to use a Gc as the wrong type"
        );
    }

    pub(crate) fn chain(&self) -> &ObjectChain {
        &self.chain
    }

    pub(crate) fn record_collection(&self, stats: GcStats) {
        self.metrics.record_collection(stats);
    }

    /// Every persistent root, then every handle stack slot.
    pub(crate) fn for_each_root<F: FnMut(Slot)>(&self, mut f: F) {
        for slot in self.roots.borrow().iter() {
            f(slot);
        }

        for slot in self.stack.borrow().iter() {
            f(*slot);
        }
    }

    // ************************************************************************
    // HANDLE STACK
    // ************************************************************************

    pub(crate) fn assert_innermost(&self, depth: usize) {
        assert_eq!(
            depth,
            self.depth.get(),
            "Attempted to use a scope that is not the innermost open scope"
        );
    }

    /// Opens a frame, returning its depth and base.
    pub(crate) fn enter_frame(&self) -> (usize, usize) {
        let depth = self.depth.get() + 1;

        self.depth.set(depth);

        (depth, self.stack.borrow().len())
    }

    pub(crate) fn exit_frame(&self, depth: usize, base: usize) {
        debug_assert_eq!(depth, self.depth.get(), "scopes must exit in LIFO order");

        self.stack.borrow_mut().truncate(base);
        self.depth.set(depth - 1);
    }

    pub(crate) fn close_frame(&self, depth: usize, base: usize, slot: Slot) {
        self.assert_innermost(depth);

        let mut stack = self.stack.borrow_mut();

        debug_assert!(stack.len() >= base);

        if stack.len() > base {
            stack[base] = slot;
        } else {
            stack.push(slot);
        }

        stack.truncate(base + 1);
    }

    pub(crate) fn push_local(&self, depth: usize, slot: Slot) {
        self.assert_innermost(depth);
        self.stack.borrow_mut().push(slot);
    }

    // ************************************************************************
    // PERSISTENT ROOTS
    // ************************************************************************

    pub(crate) fn register_root(&self, slot: Slot) -> RootId {
        self.roots.borrow_mut().insert(slot)
    }

    pub(crate) fn update_root(&self, id: RootId, slot: Slot) {
        self.roots.borrow_mut().set(id, slot);
    }

    pub(crate) fn unregister_root(&self, id: RootId) {
        self.roots.borrow_mut().remove(id);
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        debug_assert_eq!(self.depth.get(), 0);

        let destroyed = self.chain.destroy_all();

        debug!(
            "heap dropped after {} collections, destroyed {} objects",
            self.metrics.collections(),
            destroyed
        );
    }
}
