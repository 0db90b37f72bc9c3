use std::collections::HashMap;
use std::fmt;

use blockmem_disk::Disk;
use tracing::debug;

use crate::blob::Blob;
use crate::clock::{Clock, MonotonicClock};
use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectId, ObjectMetadata, StoredObject, WriteMode};
use crate::reader::ByteReader;
use crate::traits::ObjectRegistry;

/// Object registry backed by a block [`Disk`].
///
/// Maps caller-assigned ids to a blob plus usage metadata and owns the disk
/// the blobs draw their blocks from. There is no internal locking; wrap the
/// whole registry in one `Mutex` to share it between threads.
pub struct ObjectStorage<C = MonotonicClock> {
    disk: Disk,
    objects: HashMap<ObjectId, StoredObject>,
    clock: C,
}

impl ObjectStorage<MonotonicClock> {
    /// Create an empty registry over `disk`.
    pub fn new(disk: Disk) -> Self {
        Self::with_clock(disk, MonotonicClock::new())
    }
}

impl<C: Clock> ObjectStorage<C> {
    /// Create an empty registry that stamps metadata from `clock`.
    pub fn with_clock(disk: Disk, clock: C) -> Self {
        Self {
            disk,
            objects: HashMap::new(),
            clock,
        }
    }

    /// The underlying allocator, for stats and diagnostics.
    pub fn disk(&self) -> &Disk {
        &self.disk
    }

    /// Number of registered objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Sorted list of all registered ids.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Copy the content of `src` into a new object `dst`.
    ///
    /// Returns `Ok(false)` if `src` does not exist. Fails with
    /// [`StoreError::AlreadyExists`] if `dst` is taken, or with an allocator
    /// error if the copy does not fit; neither failure changes the registry.
    pub fn copy(&mut self, src: ObjectId, dst: ObjectId) -> StoreResult<bool> {
        if self.objects.contains_key(&dst) {
            return Err(StoreError::AlreadyExists(dst));
        }
        let now = self.clock.now();
        let Some(source) = self.objects.get_mut(&src) else {
            return Ok(false);
        };
        let blob = source.blob.duplicate(&mut self.disk)?;
        source.metadata.last_accessed_at = now;

        debug!(%src, %dst, size = blob.size(), "object copied");
        self.objects.insert(
            dst,
            StoredObject {
                metadata: ObjectMetadata::created(now),
                blob,
            },
        );
        Ok(true)
    }

    /// Stamp the access time of `id` and hand out its blob.
    fn touch(&mut self, id: ObjectId) -> Option<&Blob> {
        let now = self.clock.now();
        let entry = self.objects.get_mut(&id)?;
        entry.metadata.last_accessed_at = now;
        Some(&entry.blob)
    }
}

impl<C: Clock> ObjectRegistry for ObjectStorage<C> {
    fn add(&mut self, id: ObjectId) -> StoreResult<()> {
        if self.objects.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        let entry = StoredObject {
            metadata: ObjectMetadata::created(self.clock.now()),
            blob: Blob::empty(&self.disk),
        };
        self.objects.insert(id, entry);
        debug!(%id, "object added");
        Ok(())
    }

    fn write(&mut self, id: ObjectId, content: &[u8], mode: WriteMode) -> StoreResult<()> {
        match self.objects.get_mut(&id) {
            Some(entry) => {
                entry.blob.write(content, mode, &mut self.disk)?;
                entry.metadata.last_modified_at = self.clock.now();
            }
            None => {
                let blob = Blob::with_content(content, &mut self.disk)?;
                let entry = StoredObject {
                    metadata: ObjectMetadata::created(self.clock.now()),
                    blob,
                };
                self.objects.insert(id, entry);
                debug!(%id, size = content.len(), "object created by write");
            }
        }
        Ok(())
    }

    fn read(&mut self, id: ObjectId) -> Option<ByteReader<'_>> {
        self.touch(id).map(Blob::read)
    }

    fn read_range(
        &mut self,
        id: ObjectId,
        offset: usize,
        n: usize,
    ) -> StoreResult<Option<ByteReader<'_>>> {
        self.touch(id).map(|blob| blob.read_range(offset, n)).transpose()
    }

    fn read_strict(&mut self, id: ObjectId) -> Option<Vec<u8>> {
        self.touch(id).map(Blob::read_strict)
    }

    fn read_strict_range(
        &mut self,
        id: ObjectId,
        offset: usize,
        n: usize,
    ) -> StoreResult<Option<Vec<u8>>> {
        self.touch(id)
            .map(|blob| blob.read_strict_range(offset, n))
            .transpose()
    }

    fn read_metadata(&self, id: ObjectId) -> Option<ObjectMetadata> {
        self.objects.get(&id).map(|entry| entry.metadata)
    }

    fn object_size(&self, id: ObjectId) -> Option<usize> {
        self.objects.get(&id).map(|entry| entry.blob.size())
    }

    fn object_size_on_disk(&self, id: ObjectId) -> Option<usize> {
        self.objects.get(&id).map(|entry| entry.blob.total_size())
    }

    fn remove(&mut self, id: ObjectId) -> bool {
        let Some(entry) = self.objects.remove(&id) else {
            return false;
        };
        let freed = entry.blob.total_size();
        entry.blob.clear(&mut self.disk);
        debug!(%id, freed, "object removed");
        true
    }

    fn memory_used(&self) -> usize {
        self.disk.used()
    }

    fn memory_available(&self) -> usize {
        self.disk.available()
    }

    fn memory_total_capacity(&self) -> usize {
        self.disk.total_capacity()
    }
}

impl<C> fmt::Debug for ObjectStorage<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("object_count", &self.objects.len())
            .field("disk", &self.disk)
            .finish()
    }
}
