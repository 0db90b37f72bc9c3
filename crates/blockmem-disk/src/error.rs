/// Errors from block allocator operations.
#[derive(Debug, thiserror::Error)]
pub enum DiskError {
    /// A size, block count or block size outside the accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The request needs more capacity than the disk has left.
    #[error("out of disk memory: requested {requested} bytes, {available} bytes available")]
    OutOfDiskMemory { requested: usize, available: usize },

    /// A configuration document could not be parsed or failed validation.
    #[error("invalid disk configuration: {0}")]
    InvalidConfig(String),

    /// I/O error while loading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for allocator operations.
pub type DiskResult<T> = Result<T, DiskError>;
