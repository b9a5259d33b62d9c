use super::gc::Gc;
use super::scope::HandleScope;
use super::trace::Trace;

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;

/// A handle to a heap object that keeps it alive for as long as the scope
/// it was bound in stays open.
///
/// Binding a `Local` (through [`HandleScope::alloc`], [`HandleScope::bind`]
/// or [`Local::set`]) pushes its object onto the heap's handle stack.
/// Copying a `Local` only copies the reference; the copy is protected by the
/// slot the original registered, no more. The invariant `'s` lifetime
/// brands the handle with its scope so it cannot be carried out of it. Use
/// [`HandleScope::escape`] to hand an object to the enclosing scope.
///
/// The brand cannot be shortened either:
///
/// ```compile_fail
/// use scopegc::Local;
///
/// fn shorten<'a, 'b: 'a>(local: Local<'b, usize>) -> Local<'a, usize> {
///     local
/// }
/// ```
pub struct Local<'s, T: Trace> {
    gc: Option<Gc<T>>,
    _scope: PhantomData<fn(&'s ()) -> &'s ()>,
}

impl<'s, T: Trace> Copy for Local<'s, T> {}

impl<'s, T: Trace> Clone for Local<'s, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'s, T: Trace> Default for Local<'s, T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'s, T: Trace> Local<'s, T> {
    /// An unbound handle.
    pub const fn empty() -> Self {
        Self {
            gc: None,
            _scope: PhantomData,
        }
    }

    // Callers must have registered `gc` on the handle stack.
    pub(crate) fn bound(gc: Option<Gc<T>>) -> Self {
        Self {
            gc,
            _scope: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gc.is_none()
    }

    pub fn get(&self) -> Option<Gc<T>> {
        self.gc
    }

    /// # Panics
    /// If the handle is unbound.
    pub fn gc(&self) -> Gc<T> {
        match self.gc {
            Some(gc) => gc,
            None => panic!("Attempted to use an unbound Local"),
        }
    }

    /// Rebinds this handle, registering `gc` with `scope` if it differs from
    /// the current target.
    ///
    /// # Panics
    /// If `scope` is not the innermost open scope.
    pub fn set(&mut self, scope: &HandleScope<'s>, gc: Gc<T>) {
        if self.gc == Some(gc) {
            return;
        }

        *self = scope.bind(gc);
    }
}

impl<'s, T: Trace> Deref for Local<'s, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.gc.as_ref() {
            // A bound handle's object is rooted by the scope's slot.
            Some(gc) => unsafe { gc.as_ref() },
            None => panic!("Attempted to dereference an unbound Local"),
        }
    }
}

impl<'s, T: Trace> From<Local<'s, T>> for Option<Gc<T>> {
    fn from(local: Local<'s, T>) -> Self {
        local.gc
    }
}

impl<'s, T: Trace> fmt::Debug for Local<'s, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Local").field(&self.gc).finish()
    }
}
