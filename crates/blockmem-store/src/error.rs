use blockmem_disk::DiskError;

use crate::object::ObjectId;

/// Errors from blob and registry operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A read window reaches past the end of the content.
    #[error("read of {len} bytes at offset {offset} exceeds content size {size}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// `add` was called with an id that is already registered.
    #[error("object already exists: {0}")]
    AlreadyExists(ObjectId),

    /// The allocator rejected the request.
    #[error(transparent)]
    Disk(#[from] DiskError),
}

impl StoreError {
    /// Returns `true` if the allocator ran out of capacity.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::Disk(DiskError::OutOfDiskMemory { .. }))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
