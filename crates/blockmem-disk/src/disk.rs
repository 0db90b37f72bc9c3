use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::block::{Block, Space};
use crate::config::DiskConfig;
use crate::error::{DiskError, DiskResult};

/// Smallest block size the allocator accepts, in bytes.
pub const MIN_BLOCK_SIZE: usize = 64;

/// Fixed-capacity block allocator.
///
/// The disk accounts for `number_of_blocks` blocks of `block_size` bytes and
/// hands out zero-filled [`Space`]s. Returned blocks are zeroed and kept in a
/// recycling pool, so a later allocation reuses them before creating new ones.
/// The pool never grows past the number of unallocated blocks.
///
/// The disk does no locking. Every mutating call takes `&mut self`; embedders
/// that share a disk across threads guard it (usually together with the
/// registry that uses it) behind a single lock.
pub struct Disk {
    number_of_blocks: usize,
    block_size: usize,
    allocated_blocks: usize,
    pool: Vec<Block>,
    allocation_calls: u64,
}

/// Point-in-time snapshot of a disk's accounting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskStats {
    pub number_of_blocks: usize,
    pub block_size: usize,
    pub allocated_blocks: usize,
    pub total_capacity: usize,
    pub used: usize,
    pub available: usize,
    /// Zeroed blocks held for reuse.
    pub pooled_blocks: usize,
    /// Successful `allocate` calls since the disk was created.
    pub allocation_calls: u64,
}

impl Disk {
    /// Create a disk of `number_of_blocks` blocks, each `block_size` bytes.
    ///
    /// Fails with [`DiskError::InvalidArgument`] if `block_size` is below
    /// [`MIN_BLOCK_SIZE`], `number_of_blocks` is zero, or the total capacity
    /// does not fit in `usize`.
    pub fn with_blocks(number_of_blocks: usize, block_size: usize) -> DiskResult<Self> {
        check_block_size(block_size)?;
        if number_of_blocks == 0 {
            return Err(DiskError::InvalidArgument(
                "number of blocks must be positive".into(),
            ));
        }
        if number_of_blocks.checked_mul(block_size).is_none() {
            return Err(DiskError::InvalidArgument(format!(
                "{number_of_blocks} blocks of {block_size} bytes overflow the addressable capacity"
            )));
        }
        Ok(Self {
            number_of_blocks,
            block_size,
            allocated_blocks: 0,
            pool: Vec::new(),
            allocation_calls: 0,
        })
    }

    /// Create a disk holding at least `capacity` bytes, rounded up to whole
    /// blocks.
    pub fn with_capacity(capacity: usize, block_size: usize) -> DiskResult<Self> {
        check_block_size(block_size)?;
        Self::with_blocks(capacity.div_ceil(block_size), block_size)
    }

    /// Create a disk from a validated configuration.
    pub fn from_config(config: &DiskConfig) -> DiskResult<Self> {
        Self::with_blocks(config.number_of_blocks, config.block_size)
    }

    pub fn number_of_blocks(&self) -> usize {
        self.number_of_blocks
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn allocated_blocks(&self) -> usize {
        self.allocated_blocks
    }

    pub fn total_capacity(&self) -> usize {
        self.number_of_blocks * self.block_size
    }

    pub fn used(&self) -> usize {
        self.allocated_blocks * self.block_size
    }

    pub fn available(&self) -> usize {
        self.total_capacity() - self.used()
    }

    pub fn can_allocate(&self, size: usize) -> bool {
        self.available() >= size
    }

    /// A space with no blocks, sized for this disk.
    pub fn empty_space(&self) -> Space {
        Space::empty(self.block_size)
    }

    /// Hand out a zero-filled space of `ceil(size / block_size)` blocks.
    ///
    /// Either the whole request succeeds and the allocation counter moves, or
    /// [`DiskError::OutOfDiskMemory`] is returned and nothing changes.
    pub fn allocate(&mut self, size: usize) -> DiskResult<Space> {
        if !self.can_allocate(size) {
            return Err(DiskError::OutOfDiskMemory {
                requested: size,
                available: self.available(),
            });
        }
        let required = size.div_ceil(self.block_size);

        let reused = required.min(self.pool.len());
        let mut blocks = self.pool.split_off(self.pool.len() - reused);
        debug_assert!(blocks.iter().all(Block::is_zeroed), "pooled block not zeroed");
        blocks.extend((reused..required).map(|_| Block::zeroed(self.block_size)));

        self.allocated_blocks += required;
        self.allocation_calls += 1;
        trace!(size, blocks = required, reused, "allocate");
        Ok(Space::from_blocks(self.block_size, blocks))
    }

    /// Shrink `space` to `ceil(new_size / block_size)` blocks.
    ///
    /// Every block ends up zeroed: the freed ones before they enter the pool
    /// and the kept ones because the caller rewrites only `new_size` bytes.
    /// Fails with [`DiskError::InvalidArgument`] if `new_size` exceeds the
    /// space's current capacity, leaving the space untouched.
    pub fn reallocate(&mut self, space: &mut Space, new_size: usize) -> DiskResult<()> {
        if new_size > space.total_size() {
            return Err(DiskError::InvalidArgument(format!(
                "cannot reallocate {} bytes to larger size {new_size}",
                space.total_size()
            )));
        }
        let required = new_size.div_ceil(space.block_size());
        let freed = space.truncate(required);
        space.zero();

        let count = freed.len();
        self.release(count);
        self.recycle(freed);
        trace!(new_size, kept = required, freed = count, "reallocate");
        Ok(())
    }

    /// Take back every block of `space`.
    ///
    /// Capacity is returned blindly: the disk does not track which spaces it
    /// handed out, and the counter saturates at zero.
    pub fn deallocate(&mut self, space: Space) {
        let blocks = space.into_blocks();
        let count = blocks.len();
        self.release(count);
        self.recycle(blocks);
        trace!(freed = count, "deallocate");
    }

    /// Drop all pooled blocks, returning their memory to the process
    /// allocator. Capacity accounting is unaffected.
    pub fn release_pooled_blocks(&mut self) -> usize {
        let n = self.pool.len();
        self.pool = Vec::new();
        n
    }

    pub fn stats(&self) -> DiskStats {
        DiskStats {
            number_of_blocks: self.number_of_blocks,
            block_size: self.block_size,
            allocated_blocks: self.allocated_blocks,
            total_capacity: self.total_capacity(),
            used: self.used(),
            available: self.available(),
            pooled_blocks: self.pool.len(),
            allocation_calls: self.allocation_calls,
        }
    }

    fn release(&mut self, count: usize) {
        self.allocated_blocks = self.allocated_blocks.saturating_sub(count);
    }

    fn recycle(&mut self, blocks: Vec<Block>) {
        let limit = self.number_of_blocks - self.allocated_blocks;
        for mut block in blocks {
            block.zero();
            if block.len() == self.block_size && self.pool.len() < limit {
                self.pool.push(block);
            }
        }
    }
}

fn check_block_size(block_size: usize) -> DiskResult<()> {
    if block_size < MIN_BLOCK_SIZE {
        return Err(DiskError::InvalidArgument(format!(
            "block size {block_size} is below the minimum of {MIN_BLOCK_SIZE}"
        )));
    }
    Ok(())
}

impl fmt::Debug for Disk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disk")
            .field("number_of_blocks", &self.number_of_blocks)
            .field("block_size", &self.block_size)
            .field("allocated_blocks", &self.allocated_blocks)
            .field("pooled_blocks", &self.pool.len())
            .finish()
    }
}
