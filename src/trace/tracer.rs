use super::trace::Trace;
use super::trace_job::TraceJob;
use crate::allocator::LiveSet;
use crate::gc::Gc;
use crate::header::GcHeader;

use log::trace;
use std::ptr::NonNull;

/// Marks objects during a collection.
///
/// A tracer is handed to [`Trace::trace`]; implementations pass every
/// [`Gc`] they hold to [`Tracer::trace`]. Marking never recurses: objects
/// with references are queued and traced later, last in first out.
///
/// References held by heap objects are checked against the heap's live
/// objects before they are followed. One that no longer points at a live
/// object of this heap is skipped.
pub struct Tracer<'a> {
    live: &'a LiveSet,
    mark_count: usize,
    work: Vec<TraceJob>,
}

impl<'a> Tracer<'a> {
    pub(crate) fn new(live: &'a LiveSet, work: Vec<TraceJob>) -> Self {
        debug_assert!(work.is_empty());

        Self {
            live,
            mark_count: 0,
            work,
        }
    }

    pub fn trace<T: Trace>(&mut self, gc: Gc<T>) {
        let header = gc.header();

        if !self.live.contains(&header) {
            trace!("skipped dangling reference {:?}", header.as_ptr());
            return;
        }

        self.mark(Some(header));
    }

    /// Marks the object behind `ptr`, queueing it if it holds references.
    /// Returns false for null and already marked objects.
    ///
    /// `ptr` must be a live object of this heap.
    pub(crate) fn mark(&mut self, ptr: Option<NonNull<GcHeader>>) -> bool {
        let Some(ptr) = ptr else {
            return false;
        };
        let header = unsafe { ptr.as_ref() };

        if !header.mark() {
            return false;
        }

        trace!("marked object {:?}", ptr.as_ptr());
        self.mark_count += 1;

        if header.has_refs() {
            self.work.push(TraceJob::new(ptr));
        }

        true
    }

    pub(crate) fn trace_loop(&mut self) {
        while let Some(job) = self.work.pop() {
            job.trace(self);
        }
    }

    /// Number of objects marked since the last call.
    pub(crate) fn take_mark_count(&mut self) -> usize {
        std::mem::take(&mut self.mark_count)
    }

    pub(crate) fn pending(&self) -> usize {
        self.work.len()
    }

    pub(crate) fn into_work(self) -> Vec<TraceJob> {
        debug_assert!(self.work.is_empty());

        self.work
    }
}
