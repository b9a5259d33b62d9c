use super::tracer::Tracer;
use crate::gc::Gc;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// Types allocated in a [`crate::Heap`] are required to implement this trait.
///
/// `trace` must hand every [`Gc`] reachable from `self` to the tracer.
/// Missing one lets the collector free an object that is still referenced,
/// which is why this trait is unsafe to implement. Prefer
/// `#[derive(Trace)]`.
///
/// A derived type must not implement `Drop`: its destructor would run during
/// a sweep, when the objects it references may already be gone.
///
/// ```compile_fail
/// use scopegc::{Gc, Trace};
///
/// #[derive(Trace)]
/// struct Noisy {
///     next: Option<Gc<Noisy>>,
/// }
///
/// impl Drop for Noisy {
///     fn drop(&mut self) {}
/// }
/// ```
pub unsafe trait Trace: 'static {
    /// True if the type can never hold a [`Gc`]. Leaf objects are marked
    /// without ever being pushed onto the mark worklist.
    const IS_LEAF: bool;

    fn trace(&self, tracer: &mut Tracer<'_>);
}

/// TraceLeaf is a sub-trait of Trace which ensures its implementor does not
/// contain any Gc's.
pub unsafe trait TraceLeaf: Trace {
    #[doc(hidden)]
    fn __assert_trace_leaf()
    where
        Self: Sized,
    {
    }
}

// Implemented by the derives. Conflicts with the blanket impl below for any
// derived type that also implements Drop.
#[doc(hidden)]
pub trait __MustNotDrop {}

#[allow(drop_bounds)]
impl<T: Drop> __MustNotDrop for T {}

// ****************************************************************************
// TRACE LEAF IMPLS
// ****************************************************************************

macro_rules! impl_trace_leaf {
    ($($t:ty),*) => {
        $(
            unsafe impl Trace for $t {
                const IS_LEAF: bool = true;

                fn trace(&self, _: &mut Tracer<'_>) {}
            }

            unsafe impl TraceLeaf for $t {}
        )*
    };
}

impl_trace_leaf!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    &'static str
);

unsafe impl<T: TraceLeaf + Copy> TraceLeaf for Cell<T> {}
unsafe impl<T: TraceLeaf> TraceLeaf for Option<T> {}
unsafe impl<T: TraceLeaf> TraceLeaf for Box<T> {}
unsafe impl<T: TraceLeaf> TraceLeaf for Vec<T> {}
unsafe impl<const N: usize, T: TraceLeaf> TraceLeaf for [T; N] {}

// ****************************************************************************
// TRACE IMPLS
// ****************************************************************************

unsafe impl<T: Trace> Trace for Gc<T> {
    const IS_LEAF: bool = false;

    fn trace(&self, tracer: &mut Tracer<'_>) {
        tracer.trace(*self)
    }
}

unsafe impl<T: Trace> Trace for Option<T> {
    const IS_LEAF: bool = T::IS_LEAF;

    fn trace(&self, tracer: &mut Tracer<'_>) {
        if let Some(value) = self.as_ref() {
            value.trace(tracer)
        }
    }
}

unsafe impl<T: Trace + Copy> Trace for Cell<T> {
    const IS_LEAF: bool = T::IS_LEAF;

    fn trace(&self, tracer: &mut Tracer<'_>) {
        self.get().trace(tracer)
    }
}

// A collection can start from any allocation, so a `RefCell` must not be
// mutably borrowed across one. The collection is abandoned if it is.
unsafe impl<T: Trace> Trace for RefCell<T> {
    const IS_LEAF: bool = T::IS_LEAF;

    fn trace(&self, tracer: &mut Tracer<'_>) {
        match self.try_borrow() {
            Ok(value) => value.trace(tracer),
            Err(_) => panic!("Attempted to trace a RefCell that is mutably borrowed"),
        }
    }
}

unsafe impl<T: Trace> Trace for Box<T> {
    const IS_LEAF: bool = T::IS_LEAF;

    fn trace(&self, tracer: &mut Tracer<'_>) {
        (**self).trace(tracer)
    }
}

unsafe impl<T: Trace> Trace for Vec<T> {
    const IS_LEAF: bool = T::IS_LEAF;

    fn trace(&self, tracer: &mut Tracer<'_>) {
        if T::IS_LEAF {
            return;
        }

        for item in self.iter() {
            item.trace(tracer)
        }
    }
}

unsafe impl<T: Trace> Trace for VecDeque<T> {
    const IS_LEAF: bool = T::IS_LEAF;

    fn trace(&self, tracer: &mut Tracer<'_>) {
        if T::IS_LEAF {
            return;
        }

        for item in self.iter() {
            item.trace(tracer)
        }
    }
}

unsafe impl<const N: usize, T: Trace> Trace for [T; N] {
    const IS_LEAF: bool = T::IS_LEAF;

    fn trace(&self, tracer: &mut Tracer<'_>) {
        if T::IS_LEAF {
            return;
        }

        for item in self.iter() {
            item.trace(tracer)
        }
    }
}

unsafe impl<A: Trace, B: Trace> Trace for (A, B) {
    const IS_LEAF: bool = A::IS_LEAF && B::IS_LEAF;

    fn trace(&self, tracer: &mut Tracer<'_>) {
        self.0.trace(tracer);
        self.1.trace(tracer);
    }
}

unsafe impl<A: Trace, B: Trace, C: Trace> Trace for (A, B, C) {
    const IS_LEAF: bool = A::IS_LEAF && B::IS_LEAF && C::IS_LEAF;

    fn trace(&self, tracer: &mut Tracer<'_>) {
        self.0.trace(tracer);
        self.1.trace(tracer);
        self.2.trace(tracer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_constants() {
        assert!(<usize as Trace>::IS_LEAF);
        assert!(<Option<Vec<String>> as Trace>::IS_LEAF);
        assert!(<(u8, [i64; 4]) as Trace>::IS_LEAF);
        assert!(!<Gc<usize> as Trace>::IS_LEAF);
        assert!(!<Cell<Option<Gc<usize>>> as Trace>::IS_LEAF);
        assert!(!<Vec<(usize, Gc<usize>)> as Trace>::IS_LEAF);
    }
}
