use super::error::{GcError, GcResult};
use super::trace::{Trace, Tracer};

use bitflags::bitflags;
use std::alloc::{dealloc, Layout};
use std::any::TypeId;
use std::cell::Cell;
use std::mem::{align_of, size_of};
use std::ptr::{drop_in_place, NonNull};

bitflags! {
    /// Per object state kept in the [`GcHeader`].
    pub struct ObjectFlags: u8 {
        /// Reached during the current collection.
        const MARKED = 1;
        /// The object may hold `Gc` references and must be traced.
        const HAS_REFS = 1 << 1;
    }
}

pub type TraceFn = unsafe fn(NonNull<GcHeader>, &mut Tracer<'_>);
pub type DestroyFn = unsafe fn(NonNull<GcHeader>);

// Every object lives in its own allocation, preceded by its header:
//
//                        Gc<T>
//                          |
//                          V
// [ GcHeader ][ padding ][ T value ]
//
// The header links the object into the heap's chain and carries the
// monomorphised trace, destroy and type id functions of T.
pub struct GcHeader {
    next: Cell<Option<NonNull<GcHeader>>>,
    flags: Cell<ObjectFlags>,
    trace: TraceFn,
    destroy: DestroyFn,
    type_id: fn() -> TypeId,
}

impl GcHeader {
    pub fn new<T: Trace>() -> Self {
        Self {
            next: Cell::new(None),
            flags: Cell::new(ObjectFlags::empty()),
            trace: trace_object::<T>,
            destroy: destroy_object::<T>,
            type_id: TypeId::of::<T>,
        }
    }

    /// Layout of a header followed by a `T`.
    pub fn alloc_layout<T>() -> GcResult<Layout> {
        let (layout, _) = Layout::new::<GcHeader>()
            .extend(Layout::new::<T>())
            .map_err(|_| GcError::InvalidLayout)?;

        Ok(layout.pad_to_align())
    }

    // Matches the offset produced by `Layout::extend` in `alloc_layout`.
    pub const fn object_offset<T>() -> usize {
        let align = align_of::<T>();

        (size_of::<GcHeader>() + align - 1) & !(align - 1)
    }

    /// Computes where the header of the `T` at `ptr` is. The result may be
    /// dangling if the object was reclaimed; it is only dereferenced after
    /// checking it against the heap's live objects.
    ///
    /// # Safety
    /// `ptr` must have been produced by a heap allocation of a `T`.
    pub unsafe fn from_object<T>(ptr: NonNull<T>) -> NonNull<GcHeader> {
        let raw: *mut u8 = ptr.as_ptr().cast();

        NonNull::new_unchecked(raw.wrapping_sub(Self::object_offset::<T>()).cast())
    }

    /// # Safety
    /// `header` must precede a `T` allocated by a heap.
    pub unsafe fn object<T>(header: NonNull<GcHeader>) -> NonNull<T> {
        let raw: *mut u8 = header.as_ptr().cast();

        NonNull::new_unchecked(raw.add(Self::object_offset::<T>()).cast())
    }

    pub fn next(&self) -> Option<NonNull<GcHeader>> {
        self.next.get()
    }

    pub fn set_next(&self, next: Option<NonNull<GcHeader>>) {
        self.next.set(next);
    }

    pub fn flags(&self) -> ObjectFlags {
        self.flags.get()
    }

    pub fn is_marked(&self) -> bool {
        self.flags().contains(ObjectFlags::MARKED)
    }

    pub fn has_refs(&self) -> bool {
        self.flags().contains(ObjectFlags::HAS_REFS)
    }

    pub fn set_has_refs(&self, has_refs: bool) {
        let mut flags = self.flags();

        flags.set(ObjectFlags::HAS_REFS, has_refs);
        self.flags.set(flags);
    }

    /// Sets the mark bit, returning false if it was already set.
    pub fn mark(&self) -> bool {
        let flags = self.flags();

        if flags.contains(ObjectFlags::MARKED) {
            return false;
        }

        self.flags.set(flags | ObjectFlags::MARKED);
        true
    }

    pub fn unmark(&self) {
        self.flags.set(self.flags() - ObjectFlags::MARKED);
    }

    pub fn trace_fn(&self) -> TraceFn {
        self.trace
    }

    /// True if the object behind this header is a `T`.
    pub fn holds<T: 'static>(&self) -> bool {
        (self.type_id)() == TypeId::of::<T>()
    }

    /// Drops the object and releases its allocation.
    ///
    /// # Safety
    /// The object must be unlinked from its chain and never used again.
    pub unsafe fn destroy(header: NonNull<GcHeader>) {
        let destroy = header.as_ref().destroy;

        destroy(header)
    }
}

unsafe fn trace_object<T: Trace>(header: NonNull<GcHeader>, tracer: &mut Tracer<'_>) {
    GcHeader::object::<T>(header).as_ref().trace(tracer)
}

unsafe fn destroy_object<T: Trace>(header: NonNull<GcHeader>) {
    drop_in_place(GcHeader::object::<T>(header).as_ptr());

    // the layout was validated when the object was allocated
    let size = GcHeader::object_offset::<T>() + size_of::<T>();
    let align = align_of::<GcHeader>().max(align_of::<T>());
    let layout = Layout::from_size_align_unchecked(size, align).pad_to_align();

    dealloc(header.as_ptr().cast(), layout);
}
