mod trace;
mod trace_job;
mod tracer;

pub use trace::{Trace, TraceLeaf, __MustNotDrop};
pub use trace_job::TraceJob;
pub use tracer::Tracer;
