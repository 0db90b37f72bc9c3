use std::io;
use std::iter::FusedIterator;

use blockmem_disk::{Block, Space};

use crate::error::{StoreError, StoreResult};

/// Lazy, single-pass cursor over a window of a blob's bytes.
///
/// The reader borrows the backing blocks instead of copying them, so the
/// source blob cannot be written while a reader is alive. Once exhausted it
/// stays exhausted; create a new reader to read again.
#[derive(Debug)]
pub struct ByteReader<'a> {
    blocks: &'a [Block],
    block_size: usize,
    block_index: usize,
    offset: usize,
    remaining: usize,
}

impl<'a> ByteReader<'a> {
    /// Read `n` bytes starting at `start` from a space whose first `size`
    /// bytes are content.
    ///
    /// Fails with [`StoreError::OutOfBounds`] if `start + n > size` or if
    /// `size` exceeds the space's capacity.
    pub fn new(space: &'a Space, size: usize, start: usize, n: usize) -> StoreResult<Self> {
        check_window(0, size, space.total_size())?;
        check_window(start, n, size)?;
        let (block_index, offset) = space.locate(start);
        Ok(Self {
            blocks: space.blocks(),
            block_size: space.block_size(),
            block_index,
            offset,
            remaining: n,
        })
    }

    /// Read the first `size` bytes of `space`.
    pub(crate) fn full(space: &'a Space, size: usize) -> Self {
        debug_assert!(size <= space.total_size(), "content larger than its space");
        Self {
            blocks: space.blocks(),
            block_size: space.block_size(),
            block_index: 0,
            offset: 0,
            remaining: size,
        }
    }

    pub fn has_next(&self) -> bool {
        self.remaining > 0
    }

    /// Bytes left to yield.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// The unread part of the current block, capped at `remaining`.
    fn chunk(&self) -> &'a [u8] {
        if self.remaining == 0 {
            return &[];
        }
        let end = self.block_size.min(self.offset + self.remaining);
        &self.blocks[self.block_index].as_slice()[self.offset..end]
    }

    fn advance(&mut self, n: usize) {
        self.remaining -= n;
        self.offset += n;
        if self.offset == self.block_size {
            self.block_index += 1;
            self.offset = 0;
        }
    }
}

impl Iterator for ByteReader<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.remaining == 0 {
            return None;
        }
        let byte = self.blocks[self.block_index].as_slice()[self.offset];
        self.advance(1);
        Some(byte)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ByteReader<'_> {}

impl FusedIterator for ByteReader<'_> {}

impl io::Read for ByteReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            let chunk = self.chunk();
            if chunk.is_empty() {
                break;
            }
            let n = chunk.len().min(buf.len() - written);
            buf[written..written + n].copy_from_slice(&chunk[..n]);
            self.advance(n);
            written += n;
        }
        Ok(written)
    }
}

/// Validate the window `[offset, offset + len)` against `size`.
pub(crate) fn check_window(offset: usize, len: usize, size: usize) -> StoreResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(StoreError::OutOfBounds { offset, len, size }),
    }
}
