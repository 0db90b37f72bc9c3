use std::fmt;

/// A fixed-size run of bytes; the unit of allocation.
///
/// A block is either all zero (free, freshly allocated or just returned) or
/// holds content for exactly one [`Space`].
pub struct Block {
    bytes: Box<[u8]>,
}

impl Block {
    pub(crate) fn zeroed(block_size: usize) -> Self {
        Self {
            bytes: vec![0u8; block_size].into_boxed_slice(),
        }
    }

    /// Length of the block in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for a zero-length block.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Overwrite every byte with zero.
    pub fn zero(&mut self) {
        self.bytes.fill(0);
    }

    /// Returns `true` if every byte is zero.
    pub fn is_zeroed(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({} bytes)", self.bytes.len())
    }
}

/// An ordered sequence of blocks backing one buffer.
///
/// A `Space` is move-only: it is handed out by
/// [`Disk::allocate`](crate::Disk::allocate) and handed back by
/// [`Disk::deallocate`](crate::Disk::deallocate), which consumes it. Byte
/// positions map onto blocks as `(position / block_size, position % block_size)`.
#[derive(Debug)]
pub struct Space {
    block_size: usize,
    blocks: Vec<Block>,
}

impl Space {
    pub(crate) fn empty(block_size: usize) -> Self {
        Self {
            block_size,
            blocks: Vec::new(),
        }
    }

    pub(crate) fn from_blocks(block_size: usize, blocks: Vec<Block>) -> Self {
        Self { block_size, blocks }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks in the space.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Capacity in bytes: `block_size * len()`.
    pub fn total_size(&self) -> usize {
        self.block_size * self.blocks.len()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Map a byte position to `(block_index, offset_within_block)`.
    pub fn locate(&self, position: usize) -> (usize, usize) {
        (position / self.block_size, position % self.block_size)
    }

    /// Move all blocks of `other` to the end of this space.
    pub fn append(&mut self, other: Space) {
        debug_assert_eq!(self.block_size, other.block_size, "block size mismatch");
        self.blocks.extend(other.blocks);
    }

    /// Copy `data` into the space starting at byte `position`, crossing block
    /// boundaries as needed.
    ///
    /// # Panics
    ///
    /// Panics if `position + data.len()` exceeds [`total_size`](Self::total_size).
    pub fn write_at(&mut self, position: usize, data: &[u8]) {
        assert!(
            position + data.len() <= self.total_size(),
            "write of {} bytes at {position} exceeds space of {} bytes",
            data.len(),
            self.total_size()
        );
        let (mut index, mut offset) = self.locate(position);
        let mut rest = data;
        while !rest.is_empty() {
            let block = &mut self.blocks[index];
            let n = rest.len().min(self.block_size - offset);
            block.as_mut_slice()[offset..offset + n].copy_from_slice(&rest[..n]);
            rest = &rest[n..];
            index += 1;
            offset = 0;
        }
    }

    /// Copy `out.len()` bytes starting at byte `position` into `out`.
    ///
    /// # Panics
    ///
    /// Panics if `position + out.len()` exceeds [`total_size`](Self::total_size).
    pub fn read_at(&self, position: usize, out: &mut [u8]) {
        assert!(
            position + out.len() <= self.total_size(),
            "read of {} bytes at {position} exceeds space of {} bytes",
            out.len(),
            self.total_size()
        );
        let (mut index, mut offset) = self.locate(position);
        let mut filled = 0;
        while filled < out.len() {
            let n = (out.len() - filled).min(self.block_size - offset);
            out[filled..filled + n]
                .copy_from_slice(&self.blocks[index].as_slice()[offset..offset + n]);
            filled += n;
            index += 1;
            offset = 0;
        }
    }

    /// Returns `true` if every block is zero.
    pub fn is_zeroed(&self) -> bool {
        self.blocks.iter().all(Block::is_zeroed)
    }

    pub(crate) fn zero(&mut self) {
        self.blocks.iter_mut().for_each(Block::zero);
    }

    /// Keep the first `keep` blocks and return the rest.
    pub(crate) fn truncate(&mut self, keep: usize) -> Vec<Block> {
        if keep >= self.blocks.len() {
            return Vec::new();
        }
        self.blocks.split_off(keep)
    }

    pub(crate) fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}
