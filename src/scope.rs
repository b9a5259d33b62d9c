use super::error::GcResult;
use super::gc::Gc;
use super::header::GcHeader;
use super::heap::Heap;
use super::local::Local;
use super::root::Root;
use super::trace::Trace;

use std::cell::Cell;
use std::marker::PhantomData;
use std::ptr::NonNull;

// The guard behind every scope. Entering records the handle stack height as
// the frame's base, exiting truncates the stack back to it. Exit runs from
// Drop so it also happens when the scope's closure returns early or panics.
pub(crate) struct Frame<'h> {
    heap: &'h Heap,
    base: Cell<usize>,
    depth: usize,
}

impl<'h> Frame<'h> {
    pub fn enter(heap: &'h Heap) -> Self {
        let (depth, base) = heap.enter_frame();

        Self {
            heap,
            base: Cell::new(base),
            depth,
        }
    }

    pub fn heap(&self) -> &'h Heap {
        self.heap
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Moves `slot` into the stack position at this frame's base, drops
    /// everything above it, and raises the base past it. The slot now belongs
    /// to the enclosing frame and outlives this one.
    pub fn close(&self, slot: Option<NonNull<GcHeader>>) {
        let base = self.base.get();

        self.heap.close_frame(self.depth, base, slot);
        self.base.set(base + 1);
    }
}

impl<'h> Drop for Frame<'h> {
    fn drop(&mut self) {
        self.heap.exit_frame(self.depth, self.base.get());
    }
}

/// An open frame of the heap's handle stack.
///
/// Scopes are only ever lent out to closures, by [`Heap::scope`],
/// [`HandleScope::nested`] and [`HandleScope::escape`], and close when the
/// closure returns. Every handle bound through a scope stays a root until
/// that scope closes. Handles must be bound through the innermost open
/// scope; binding through an outer one while a nested scope is open panics.
pub struct HandleScope<'s> {
    frame: &'s Frame<'s>,
    _brand: PhantomData<&'s ()>,
}

impl<'s> HandleScope<'s> {
    pub(crate) fn new(frame: &'s Frame<'s>) -> Self {
        Self {
            frame,
            _brand: PhantomData,
        }
    }

    pub fn heap(&self) -> &'s Heap {
        self.frame.heap()
    }

    /// Moves `value` into the heap and binds it to a new handle. May run a
    /// collection first, in which case `value` is not yet on the heap: any
    /// `Gc` it holds must already be protected by a handle or root.
    ///
    /// # Panics
    /// If this is not the innermost open scope.
    pub fn alloc<T: Trace>(&self, value: T) -> GcResult<Local<'s, T>> {
        let gc = self.heap().alloc_object(self.frame.depth(), value)?;

        Ok(Local::bound(Some(gc)))
    }

    /// Binds an existing object to a new handle of this scope. This is how
    /// a `Gc` read out of another object is dereferenced.
    ///
    /// # Panics
    /// If this is not the innermost open scope, or if `gc` is not a live `T`
    /// of this scope's heap.
    pub fn bind<T: Trace>(&self, gc: Gc<T>) -> Local<'s, T> {
        let heap = self.heap();

        heap.assert_owns(gc);
        heap.push_local(self.frame.depth(), Some(gc.header()));

        Local::bound(Some(gc))
    }

    /// Binds the object in `gc`, if any. Convenient for following optional
    /// references such as `Cell<Option<Gc<T>>>` fields.
    pub fn bind_opt<T: Trace>(&self, gc: Option<Gc<T>>) -> Option<Local<'s, T>> {
        gc.map(|gc| self.bind(gc))
    }

    pub fn bind_root<T: Trace>(&self, root: &Root<'_, T>) -> Local<'s, T> {
        self.bind(root.gc())
    }

    /// Registers the object behind `local` as a persistent root. The root
    /// borrows the heap only as long as this scope; use [`Root::new`] with
    /// the heap itself for one that outlives it.
    ///
    /// # Panics
    /// If the handle is unbound or belongs to another heap.
    pub fn root<T: Trace>(&self, local: Local<'_, T>) -> Root<'s, T> {
        Root::new(self.heap(), local.gc())
    }

    /// Runs `f` within a nested scope. Handles bound inside it are released
    /// when it returns.
    pub fn nested<F, R>(&self, f: F) -> R
    where
        F: for<'i> FnOnce(&'i HandleScope<'i>) -> R,
    {
        let frame = Frame::enter(self.heap());
        let scope = HandleScope::new(&frame);

        f(&scope)
    }

    /// Runs `f` within a nested scope and closes it over the handle `f`
    /// returns: that one object is promoted into this scope, every other
    /// handle of the nested scope is released. The promoted object is a root
    /// at every point in between.
    ///
    /// # Panics
    /// If this is not the innermost open scope.
    pub fn escape<F, T>(&self, f: F) -> GcResult<Local<'s, T>>
    where
        F: for<'i> FnOnce(&'i HandleScope<'i>) -> GcResult<Local<'i, T>>,
        T: Trace,
    {
        self.heap().assert_innermost(self.frame.depth());

        let frame = Frame::enter(self.heap());
        let scope = HandleScope::new(&frame);
        let escaped = f(&scope)?.get();

        frame.close(escaped.map(|gc| gc.header()));

        Ok(Local::bound(escaped))
    }
}

impl Heap {
    /// Runs `f` within a new scope of this heap. Handles bound inside it are
    /// released when it returns, even by panic.
    ///
    /// ```
    /// use scopegc::{Heap, Trace};
    /// use std::cell::Cell;
    ///
    /// #[derive(Trace)]
    /// struct Counter {
    ///     hits: Cell<usize>,
    /// }
    ///
    /// let heap = Heap::new();
    ///
    /// heap.scope(|s| {
    ///     let counter = s.alloc(Counter { hits: Cell::new(0) }).unwrap();
    ///
    ///     heap.collect();
    ///     counter.hits.set(counter.hits.get() + 1);
    ///
    ///     assert_eq!(counter.hits.get(), 1);
    /// });
    /// ```
    pub fn scope<F, R>(&self, f: F) -> R
    where
        F: for<'s> FnOnce(&'s HandleScope<'s>) -> R,
    {
        let frame = Frame::enter(self);
        let scope = HandleScope::new(&frame);

        f(&scope)
    }
}
