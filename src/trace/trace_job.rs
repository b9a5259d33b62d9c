use super::tracer::Tracer;
use crate::header::{GcHeader, TraceFn};
use std::ptr::NonNull;

/// A marked object whose references have not been traced yet.
pub struct TraceJob {
    ptr: NonNull<GcHeader>,
    dyn_trace: TraceFn,
}

impl TraceJob {
    pub fn new(ptr: NonNull<GcHeader>) -> Self {
        let dyn_trace = unsafe { ptr.as_ref().trace_fn() };

        Self { ptr, dyn_trace }
    }

    pub fn trace(&self, tracer: &mut Tracer<'_>) {
        unsafe { (self.dyn_trace)(self.ptr, tracer) }
    }
}
