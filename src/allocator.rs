use super::config::GcConfig;
use super::error::{GcError, GcResult};
use super::header::GcHeader;

use log::trace;
use rustc_hash::FxHasher;
use std::alloc::{alloc_zeroed, Layout};
use std::cell::{Cell, Ref, RefCell};
use std::hash::BuildHasherDefault;
use std::ptr::NonNull;

pub type LiveSet = std::collections::HashSet<NonNull<GcHeader>, BuildHasherDefault<FxHasher>>;

/// Counts the bytes allocated since the last collection and decides when
/// an allocation must first run a collection.
pub struct Allocator {
    allocated: Cell<usize>,
    threshold: usize,
}

impl Allocator {
    pub fn new(config: &GcConfig) -> Self {
        Self {
            allocated: Cell::new(0),
            threshold: config.collect_threshold,
        }
    }

    /// Records an allocation of `size` bytes. Returns true if the counter
    /// reached the threshold, in which case the caller must collect and then
    /// [`Allocator::reset`] before handing out memory.
    pub fn record(&self, size: usize) -> bool {
        let allocated = self.allocated.get().saturating_add(size);

        self.allocated.set(allocated);
        allocated >= self.threshold
    }

    pub fn reset(&self) {
        self.allocated.set(0);
    }

    pub fn allocated(&self) -> usize {
        self.allocated.get()
    }

    /// Zero filled memory for `layout`, so a trace that runs before the
    /// object is fully written never reads garbage.
    pub fn alloc(layout: Layout) -> GcResult<NonNull<u8>> {
        debug_assert!(layout.size() > 0);

        let ptr = unsafe { alloc_zeroed(layout) };

        NonNull::new(ptr).ok_or(GcError::AllocationFailure {
            size: layout.size(),
            align: layout.align(),
        })
    }
}

/// Intrusive singly linked list of every object owned by a heap, threaded
/// through the object headers. Newest objects are at the head.
///
/// The chain also indexes its headers, so a pointer can be checked for
/// belonging to a live object of this heap without dereferencing it.
pub struct ObjectChain {
    head: Cell<Option<NonNull<GcHeader>>>,
    len: Cell<usize>,
    live: RefCell<LiveSet>,
}

impl ObjectChain {
    pub fn new() -> Self {
        Self {
            head: Cell::new(None),
            len: Cell::new(0),
            live: RefCell::new(LiveSet::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    pub fn contains(&self, ptr: NonNull<GcHeader>) -> bool {
        self.live.borrow().contains(&ptr)
    }

    pub fn live(&self) -> Ref<'_, LiveSet> {
        self.live.borrow()
    }

    /// Clears every mark. Used to recover from a collection that unwound.
    pub fn clear_marks(&self) {
        let mut current = self.head.get();

        while let Some(ptr) = current {
            let header = unsafe { ptr.as_ref() };

            header.unmark();
            current = header.next();
        }
    }

    /// Links a freshly written object at the head of the chain, unmarked.
    pub fn register(&self, ptr: NonNull<GcHeader>, has_refs: bool) {
        let header = unsafe { ptr.as_ref() };

        header.set_has_refs(has_refs);
        header.unmark();
        header.set_next(self.head.get());

        self.live.borrow_mut().insert(ptr);
        self.head.set(Some(ptr));
        self.len.set(self.len.get() + 1);
    }

    /// Destroys every unmarked object and clears the mark on the rest.
    /// Returns `(survivors, reclaimed)`. An object is unlinked before its
    /// destructor runs, so a panicking destructor leaves the chain
    /// consistent and only leaks that object.
    pub fn sweep(&self) -> (usize, usize) {
        let mut survivors = 0;
        let mut reclaimed = 0;
        let mut prev: Option<NonNull<GcHeader>> = None;
        let mut current = self.head.get();

        while let Some(ptr) = current {
            let header = unsafe { ptr.as_ref() };
            let next = header.next();

            if header.is_marked() {
                header.unmark();
                survivors += 1;
                prev = Some(ptr);
            } else {
                match prev {
                    Some(prev) => unsafe { prev.as_ref().set_next(next) },
                    None => self.head.set(next),
                }

                self.live.borrow_mut().remove(&ptr);
                self.len.set(self.len.get() - 1);

                trace!("freeing object {:?}", ptr.as_ptr());
                unsafe { GcHeader::destroy(ptr) };
                reclaimed += 1;
            }

            current = next;
        }

        (survivors, reclaimed)
    }

    /// Destroys every object regardless of marks.
    pub fn destroy_all(&self) -> usize {
        let mut destroyed = 0;
        let mut current = self.head.take();

        self.len.set(0);
        self.live.borrow_mut().clear();

        while let Some(ptr) = current {
            current = unsafe { ptr.as_ref().next() };

            unsafe { GcHeader::destroy(ptr) };
            destroyed += 1;
        }

        destroyed
    }
}
