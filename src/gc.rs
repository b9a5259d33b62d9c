use super::header::GcHeader;
use super::trace::Trace;

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

// A Gc points to a valid T within a Heap which is preceded by its header
// and possibly some padding.
//
//                        Gc<T>
//                          |
//                          V
// [ GcHeader ][ padding ][ T value ]

/// A traced reference to a value allocated in a [`crate::Heap`].
///
/// `Gc` is what heap objects store to refer to each other. It is `Copy` and
/// untracked: holding a `Gc` does not keep its target alive, so it cannot be
/// dereferenced directly. Bind it to a handle with
/// [`crate::HandleScope::bind`], which checks that the target is still a
/// live object of that heap, or use the unsafe [`Gc::as_ref`].
///
/// ```compile_fail
/// use scopegc::Heap;
///
/// let heap = Heap::new();
/// let gc = heap.scope(|s| s.alloc(1usize).unwrap().gc());
///
/// heap.collect();
/// assert_eq!(*gc, 1);
/// ```
///
/// Because any number of objects may share a `Gc`, mutation of a heap value
/// goes through interior mutability such as `Cell<Option<Gc<T>>>`.
pub struct Gc<T: Trace> {
    ptr: NonNull<T>,
    _marker: PhantomData<T>,
}

impl<T: Trace> Copy for Gc<T> {}

impl<T: Trace> Clone for Gc<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Trace> PartialEq for Gc<T> {
    fn eq(&self, other: &Self) -> bool {
        Gc::ptr_eq(self, other)
    }
}

impl<T: Trace> Eq for Gc<T> {}

impl<T: Trace> fmt::Debug for Gc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Gc").field(&self.ptr).finish()
    }
}

impl<T: Trace> Gc<T> {
    // SAFETY: the pointer must be to a T allocated within a heap
    pub(crate) unsafe fn from_nonnull(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _marker: PhantomData::<T>,
        }
    }

    pub(crate) fn header(&self) -> NonNull<GcHeader> {
        unsafe { GcHeader::from_object(self.ptr) }
    }

    /// # Safety
    /// The target must not have been reclaimed, and must not be reclaimed
    /// while the returned reference is in use. Binding the `Gc` to a handle
    /// first makes both hold.
    pub unsafe fn as_ref(&self) -> &T {
        self.ptr.as_ref()
    }

    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// True if both point at the same object.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.ptr == other.ptr
    }
}
