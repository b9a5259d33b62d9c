//! A precise mark and sweep garbage collector with scoped handles.
//!
//! A [`Heap`] owns every object allocated in it. Objects are kept alive by
//! roots the heap knows about precisely, never by scanning the native stack:
//! the [`Local`] handles of currently open [`HandleScope`]s and the
//! persistent [`Root`]s. Everything reachable from those, through each
//! object's [`Trace`] impl, survives a collection; everything else is
//! dropped and freed.
//!
//! ```rust
//! use scopegc::{Gc, Heap, Root, Trace};
//! use std::cell::Cell;
//!
//! #[derive(Trace)]
//! struct Node {
//!     value: usize,
//!     next: Cell<Option<Gc<Node>>>,
//! }
//!
//! let heap = Heap::new();
//!
//! let head = heap.scope(|s| {
//!     let a = s.alloc(Node { value: 1, next: Cell::new(None) }).unwrap();
//!     let b = s.alloc(Node { value: 2, next: Cell::new(None) }).unwrap();
//!     let _garbage = s.alloc(Node { value: 3, next: Cell::new(None) }).unwrap();
//!
//!     a.next.set(Some(b.gc()));
//!
//!     Root::new(&heap, a.gc())
//! });
//!
//! // the scope is closed, only the root keeps `a` and `b` alive
//! let stats = heap.collect();
//!
//! assert_eq!(stats.survivors, 2);
//! assert_eq!(stats.reclaimed, 1);
//!
//! // a `Gc` read out of an object is bound to a handle before use
//! heap.scope(|s| assert_eq!(s.bind(head.next.get().unwrap()).value, 2));
//! ```
//!
//! Values computed inside a nested scope are handed back to the enclosing
//! scope with [`HandleScope::escape`]:
//!
//! ```rust
//! use scopegc::{Gc, Heap, Trace};
//! use std::cell::Cell;
//!
//! #[derive(Trace)]
//! struct Node {
//!     next: Cell<Option<Gc<Node>>>,
//! }
//!
//! let heap = Heap::new();
//!
//! heap.scope(|s| {
//!     let list = s
//!         .escape(|inner| {
//!             let mut head = inner.alloc(Node { next: Cell::new(None) })?;
//!
//!             for _ in 0..10 {
//!                 let node = inner.alloc(Node { next: Cell::new(Some(head.gc())) })?;
//!                 head = node;
//!             }
//!
//!             Ok(head)
//!         })
//!         .unwrap();
//!
//!     assert_eq!(heap.collect().survivors, 11);
//!     assert!(list.next.get().is_some());
//! });
//! ```
extern crate self as scopegc;

mod allocator;
mod collector;
mod config;
mod error;
mod gc;
mod header;
mod heap;
mod local;
mod metrics;
mod observer;
mod root;
mod scope;
mod trace;

pub use collector::GcState;
pub use config::{GcConfig, GC_CONFIG_DEFAULT_COLLECT_THRESHOLD};
pub use error::{GcError, GcResult};
pub use gc::Gc;
pub use heap::Heap;
pub use local::Local;
pub use metrics::GcMetrics;
pub use observer::{GcObserver, GcStats, LogObserver};
pub use root::Root;
pub use scope::HandleScope;
pub use scopegc_derive::{Trace, TraceLeaf};
pub use trace::{Trace, TraceLeaf, Tracer};

#[doc(hidden)]
pub use trace::__MustNotDrop;

#[cfg(test)]
mod test;
