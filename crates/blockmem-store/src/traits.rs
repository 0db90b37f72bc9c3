use crate::error::StoreResult;
use crate::object::{ObjectId, ObjectMetadata, WriteMode};
use crate::reader::ByteReader;

/// Id-keyed object registry over block-backed buffers.
///
/// All implementations must satisfy these invariants:
/// - Ids are assigned by the caller; the registry never generates them.
/// - An unknown id is reported as `None`, never as an error.
/// - A write that fails leaves the previous content and metadata intact.
/// - Reads stamp `last_accessed_at` before delegating; metadata inspection
///   does not count as an access.
/// - Mutation takes `&mut self`. Shared use needs one external lock around
///   the whole registry.
pub trait ObjectRegistry {
    /// Register an empty object.
    ///
    /// Fails with [`StoreError::AlreadyExists`](crate::StoreError::AlreadyExists)
    /// if `id` is present.
    fn add(&mut self, id: ObjectId) -> StoreResult<()>;

    /// Write content to `id`, creating the object if it does not exist.
    fn write(&mut self, id: ObjectId, content: &[u8], mode: WriteMode) -> StoreResult<()>;

    /// Lazy reader over the whole content of `id`.
    fn read(&mut self, id: ObjectId) -> Option<ByteReader<'_>>;

    /// Lazy reader over `n` bytes of `id` starting at `offset`.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn read_range(&mut self, id: ObjectId, offset: usize, n: usize)
        -> StoreResult<Option<ByteReader<'_>>>;

    /// Copy of the whole content of `id`.
    fn read_strict(&mut self, id: ObjectId) -> Option<Vec<u8>>;

    /// Copy of `n` bytes of `id` starting at `offset`.
    fn read_strict_range(&mut self, id: ObjectId, offset: usize, n: usize)
        -> StoreResult<Option<Vec<u8>>>;

    /// Current metadata of `id`. Does not update the access time.
    fn read_metadata(&self, id: ObjectId) -> Option<ObjectMetadata>;

    /// Content length of `id` in bytes.
    fn object_size(&self, id: ObjectId) -> Option<usize>;

    /// Block-aligned capacity held by `id`.
    fn object_size_on_disk(&self, id: ObjectId) -> Option<usize>;

    /// Remove `id` and return its blocks to the allocator.
    ///
    /// Returns `true` if the object existed.
    fn remove(&mut self, id: ObjectId) -> bool;

    fn memory_used(&self) -> usize;

    fn memory_available(&self) -> usize;

    fn memory_total_capacity(&self) -> usize;

    /// Check whether `id` is registered.
    fn exists(&self, id: ObjectId) -> bool {
        self.read_metadata(id).is_some()
    }
}
