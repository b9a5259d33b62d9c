use thiserror::Error;

/// Errors returned by allocation.
///
/// After an allocation failure the heap is still memory safe, but nothing
/// guarantees a later allocation will succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GcError {
    #[error("failed to allocate {size} bytes aligned to {align}")]
    AllocationFailure { size: usize, align: usize },

    #[error("object layout overflows when combined with its header")]
    InvalidLayout,
}

pub type GcResult<T> = Result<T, GcError>;
