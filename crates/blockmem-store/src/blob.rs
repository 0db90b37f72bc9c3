use blockmem_disk::{Disk, Space};

use crate::error::StoreResult;
use crate::object::WriteMode;
use crate::reader::{check_window, ByteReader};

/// One object's bytes, held as an ordered run of fixed-size blocks.
///
/// `size` bytes of content live at the front of the space; the rest of the
/// last block is zero and serves as append headroom. The blob does not own
/// its [`Disk`]: operations that change capacity borrow it from the caller,
/// which must always pass the disk the blob's blocks came from.
///
/// Writes are staged: every allocator call that can fail runs before any byte
/// of the blob changes, so a failed write leaves the previous content intact
/// and readable.
#[derive(Debug)]
pub struct Blob {
    space: Space,
    size: usize,
}

impl Blob {
    /// A zero-size blob with no blocks.
    pub fn empty(disk: &Disk) -> Self {
        Self {
            space: disk.empty_space(),
            size: 0,
        }
    }

    /// A blob holding `content`.
    pub fn with_content(content: &[u8], disk: &mut Disk) -> StoreResult<Self> {
        let mut blob = Self::empty(disk);
        blob.write(content, WriteMode::Overwrite, disk)?;
        Ok(blob)
    }

    /// Content length in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Capacity in bytes, always a multiple of the block size.
    pub fn total_size(&self) -> usize {
        self.space.total_size()
    }

    /// Headroom left before an append needs new blocks.
    pub fn available(&self) -> usize {
        self.total_size() - self.size
    }

    pub fn block_size(&self) -> usize {
        self.space.block_size()
    }

    pub fn block_count(&self) -> usize {
        self.space.len()
    }

    /// Write `content` according to `mode`.
    ///
    /// - [`WriteMode::Append`] copies `content` after the current content,
    ///   allocating only the bytes that do not fit in the headroom.
    /// - [`WriteMode::Overwrite`] replaces the content. A shorter content
    ///   returns surplus blocks to the disk; a longer one requests
    ///   `len - available()` more bytes.
    pub fn write(&mut self, content: &[u8], mode: WriteMode, disk: &mut Disk) -> StoreResult<()> {
        match mode {
            WriteMode::Append => self.append(content, disk),
            WriteMode::Overwrite => self.overwrite(content, disk),
        }
    }

    fn append(&mut self, content: &[u8], disk: &mut Disk) -> StoreResult<()> {
        let available = self.available();
        if content.len() > available {
            let extra = disk.allocate(content.len() - available)?;
            self.space.append(extra);
        }
        self.space.write_at(self.size, content);
        self.size += content.len();
        Ok(())
    }

    fn overwrite(&mut self, content: &[u8], disk: &mut Disk) -> StoreResult<()> {
        let len = content.len();
        let total = self.total_size();
        if len < total {
            // Zeroes the kept blocks too, so no stale bytes survive past `len`.
            disk.reallocate(&mut self.space, len)?;
        } else if len > total {
            let extra = disk.allocate(len - self.available())?;
            self.space.append(extra);
        }
        self.space.write_at(0, content);
        self.size = len;
        Ok(())
    }

    /// Lazy reader over the whole content.
    pub fn read(&self) -> ByteReader<'_> {
        ByteReader::full(&self.space, self.size)
    }

    /// Lazy reader over `n` bytes starting at `offset`.
    pub fn read_range(&self, offset: usize, n: usize) -> StoreResult<ByteReader<'_>> {
        ByteReader::new(&self.space, self.size, offset, n)
    }

    /// Copy of the whole content.
    pub fn read_strict(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.size];
        self.space.read_at(0, &mut out);
        out
    }

    /// Copy of `n` bytes starting at `offset`.
    pub fn read_strict_range(&self, offset: usize, n: usize) -> StoreResult<Vec<u8>> {
        check_window(offset, n, self.size)?;
        let mut out = vec![0u8; n];
        self.space.read_at(offset, &mut out);
        Ok(out)
    }

    /// A new blob with the same content in freshly allocated blocks.
    ///
    /// The copy is sized to the content, so it may hold fewer blocks than
    /// `self`.
    pub fn duplicate(&self, disk: &mut Disk) -> StoreResult<Self> {
        let mut space = disk.allocate(self.size)?;
        let block_size = self.block_size();
        for (index, block) in self.space.blocks().iter().take(space.len()).enumerate() {
            space.write_at(index * block_size, block.as_slice());
        }
        Ok(Self {
            space,
            size: self.size,
        })
    }

    /// Return every block to `disk`. The blob is consumed.
    pub fn clear(self, disk: &mut Disk) {
        disk.deallocate(self.space);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use proptest::prelude::*;

    fn disk(blocks: usize) -> Disk {
        Disk::with_blocks(blocks, 64).unwrap()
    }

    fn assert_invariants(blob: &Blob) {
        assert_eq!(blob.total_size() % blob.block_size(), 0);
        assert!(blob.size() <= blob.total_size());
        assert_eq!(blob.available(), blob.total_size() - blob.size());
        let mut tail = vec![0u8; blob.available()];
        blob.space.read_at(blob.size(), &mut tail);
        assert!(tail.iter().all(|&b| b == 0), "bytes past size must be zero");
    }

    fn repeat(s: &[u8], times: usize) -> Vec<u8> {
        s.repeat(times)
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn empty_blob_has_no_blocks() {
        let d = disk(4);
        let blob = Blob::empty(&d);
        assert_eq!(blob.size(), 0);
        assert_eq!(blob.total_size(), 0);
        assert_eq!(blob.block_count(), 0);
        assert_eq!(blob.read().count(), 0);
    }

    #[test]
    fn with_content_sizes_to_blocks() {
        let mut d = disk(4);
        let blob = Blob::with_content(b"some-content", &mut d).unwrap();
        assert_eq!(blob.size(), 12);
        assert_eq!(blob.total_size(), 64);
        assert_eq!(blob.available(), 52);
        assert_eq!(blob.read_strict(), b"some-content");
        assert_invariants(&blob);
    }

    #[test]
    fn partial_last_block_geometry() {
        // 1.5 blocks of content leaves half a block of headroom.
        let mut d = disk(8);
        let content = repeat(b"some-content", 8);
        let blob = Blob::with_content(&content, &mut d).unwrap();
        assert_eq!(blob.size(), 96);
        assert_eq!(blob.total_size(), 128);
        assert_eq!(blob.available(), 32);
        assert_invariants(&blob);
    }

    // -----------------------------------------------------------------------
    // Append
    // -----------------------------------------------------------------------

    #[test]
    fn append_past_headroom_allocates_blocks() {
        let mut d = disk(8);
        let original = repeat(b"some-content", 8);
        let extra = repeat(b"-additional-content", 8);
        let mut blob = Blob::with_content(&original, &mut d).unwrap();
        let total_before = blob.total_size();

        blob.write(&extra, WriteMode::Append, &mut d).unwrap();

        let mut expected = original.clone();
        expected.extend_from_slice(&extra);
        assert_eq!(blob.read_strict(), expected);
        assert_eq!(blob.size(), original.len() + extra.len());
        assert_eq!((blob.total_size() - total_before) % 64, 0);
        assert_eq!(blob.total_size(), 256);
        assert_eq!(d.used(), 256);
        assert_invariants(&blob);
    }

    #[test]
    fn append_within_headroom_skips_allocator() {
        let mut d = disk(4);
        let mut blob = Blob::with_content(b"some-content", &mut d).unwrap();
        let calls = d.stats().allocation_calls;

        blob.write(b"-additional-content", WriteMode::Append, &mut d).unwrap();

        assert_eq!(d.stats().allocation_calls, calls);
        assert_eq!(blob.total_size(), 64);
        assert_eq!(blob.read_strict(), b"some-content-additional-content");
        assert_invariants(&blob);
    }

    #[test]
    fn append_exactly_fills_headroom() {
        let mut d = disk(4);
        let mut blob = Blob::with_content(&[1u8; 60], &mut d).unwrap();
        blob.write(&[2u8; 4], WriteMode::Append, &mut d).unwrap();
        assert_eq!(blob.available(), 0);
        assert_eq!(blob.block_count(), 1);
        blob.write(&[3u8], WriteMode::Append, &mut d).unwrap();
        assert_eq!(blob.block_count(), 2);
        assert_eq!(blob.read_strict_range(63, 2).unwrap(), vec![2, 3]);
    }

    #[test]
    fn append_to_empty_blob() {
        let mut d = disk(4);
        let mut blob = Blob::empty(&d);
        blob.write(b"hello", WriteMode::Append, &mut d).unwrap();
        assert_eq!(blob.read_strict(), b"hello");
        assert_eq!(blob.total_size(), 64);
    }

    #[test]
    fn failed_append_keeps_content() {
        let mut d = disk(2);
        let original = vec![9u8; 100];
        let mut blob = Blob::with_content(&original, &mut d).unwrap();
        assert_eq!(d.available(), 0);

        let err = blob.write(&[1u8; 50], WriteMode::Append, &mut d).unwrap_err();
        assert!(err.is_out_of_memory());
        assert_eq!(blob.size(), 100);
        assert_eq!(blob.total_size(), 128);
        assert_eq!(blob.read_strict(), original);
        assert_eq!(d.used(), 128);
    }

    // -----------------------------------------------------------------------
    // Overwrite
    // -----------------------------------------------------------------------

    #[test]
    fn overwrite_shorter_returns_blocks() {
        let mut d = disk(8);
        let mut blob = Blob::with_content(&[0xAB; 300], &mut d).unwrap();
        assert_eq!(d.used(), 320);

        blob.write(b"short", WriteMode::Overwrite, &mut d).unwrap();

        assert_eq!(blob.read_strict(), b"short");
        assert_eq!(blob.total_size(), 64);
        assert_eq!(d.used(), 64);
        assert_eq!(d.available(), 448);
        assert_invariants(&blob);
    }

    #[test]
    fn overwrite_same_capacity_keeps_space() {
        let mut d = disk(4);
        let mut blob = Blob::with_content(&[1u8; 64], &mut d).unwrap();
        let calls = d.stats().allocation_calls;
        blob.write(&[2u8; 64], WriteMode::Overwrite, &mut d).unwrap();
        assert_eq!(d.stats().allocation_calls, calls);
        assert_eq!(blob.read_strict(), vec![2u8; 64]);
        assert_eq!(blob.total_size(), 64);
    }

    #[test]
    fn overwrite_longer_requests_len_minus_headroom() {
        let mut d = disk(8);
        let mut blob = Blob::with_content(&[1u8; 10], &mut d).unwrap();
        assert_eq!(blob.available(), 54);

        // 100 bytes exceed the 64-byte capacity; 100 - 54 = 46 more bytes are
        // requested, one block.
        blob.write(&[2u8; 100], WriteMode::Overwrite, &mut d).unwrap();
        assert_eq!(blob.size(), 100);
        assert_eq!(blob.total_size(), 128);
        assert_eq!(blob.read_strict(), vec![2u8; 100]);
        assert_invariants(&blob);
    }

    #[test]
    fn overwrite_growth_keeps_previous_headroom_as_slack() {
        let mut d = disk(8);
        let mut blob = Blob::with_content(&[1u8; 70], &mut d).unwrap();
        assert_eq!(blob.available(), 58);

        // 140 - 58 = 82 bytes requested: two more blocks, one more than the
        // content strictly needs.
        blob.write(&[2u8; 140], WriteMode::Overwrite, &mut d).unwrap();
        assert_eq!(blob.total_size(), 256);
        assert_eq!(blob.size(), 140);
        assert_invariants(&blob);
    }

    #[test]
    fn overwrite_with_empty_content_frees_everything() {
        let mut d = disk(4);
        let mut blob = Blob::with_content(&[5u8; 200], &mut d).unwrap();
        blob.write(&[], WriteMode::Overwrite, &mut d).unwrap();
        assert_eq!(blob.size(), 0);
        assert_eq!(blob.total_size(), 0);
        assert_eq!(d.used(), 0);
    }

    #[test]
    fn failed_overwrite_keeps_content() {
        let mut d = disk(2);
        let original = b"precious".to_vec();
        let mut blob = Blob::with_content(&original, &mut d).unwrap();

        let err = blob.write(&[0u8; 500], WriteMode::Overwrite, &mut d).unwrap_err();
        assert!(matches!(err, StoreError::Disk(_)));
        assert_eq!(blob.read_strict(), original);
        assert_eq!(blob.total_size(), 64);
        assert_eq!(d.used(), 64);
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    #[test]
    fn read_range_matches_strict() {
        let mut d = disk(8);
        let content: Vec<u8> = (0..250u8).collect();
        let blob = Blob::with_content(&content, &mut d).unwrap();
        let lazy: Vec<u8> = blob.read_range(30, 120).unwrap().collect();
        assert_eq!(lazy, blob.read_strict_range(30, 120).unwrap());
        assert_eq!(lazy, &content[30..150]);
    }

    #[test]
    fn read_range_out_of_bounds() {
        let mut d = disk(4);
        let blob = Blob::with_content(b"some-content", &mut d).unwrap();
        assert!(matches!(
            blob.read_range(5, 8),
            Err(StoreError::OutOfBounds { .. })
        ));
        assert!(matches!(
            blob.read_strict_range(13, 0),
            Err(StoreError::OutOfBounds { .. })
        ));
        assert!(blob.read_strict_range(12, 0).unwrap().is_empty());
    }

    #[test]
    fn read_does_not_expose_headroom() {
        let mut d = disk(4);
        let blob = Blob::with_content(b"abc", &mut d).unwrap();
        assert_eq!(blob.read().collect::<Vec<u8>>(), b"abc");
    }

    // -----------------------------------------------------------------------
    // Duplicate / clear
    // -----------------------------------------------------------------------

    #[test]
    fn duplicate_copies_into_new_blocks() {
        let mut d = disk(8);
        let content: Vec<u8> = (0..150u8).collect();
        let mut blob = Blob::with_content(&content, &mut d).unwrap();
        let copy = blob.duplicate(&mut d).unwrap();
        assert_eq!(copy.read_strict(), content);
        assert_eq!(d.used(), 384);

        blob.write(b"changed", WriteMode::Overwrite, &mut d).unwrap();
        assert_eq!(copy.read_strict(), content);
        assert_invariants(&copy);
    }

    #[test]
    fn duplicate_is_compact() {
        let mut d = disk(8);
        let mut blob = Blob::with_content(&[1u8; 70], &mut d).unwrap();
        blob.write(&[2u8; 140], WriteMode::Overwrite, &mut d).unwrap();
        let copy = blob.duplicate(&mut d).unwrap();
        assert_eq!(copy.total_size(), 192);
        assert_eq!(copy.read_strict(), blob.read_strict());
    }

    #[test]
    fn duplicate_fails_without_capacity() {
        let mut d = disk(2);
        let blob = Blob::with_content(&[1u8; 100], &mut d).unwrap();
        assert!(blob.duplicate(&mut d).unwrap_err().is_out_of_memory());
        assert_eq!(d.used(), 128);
    }

    #[test]
    fn clear_returns_all_blocks() {
        let mut d = disk(8);
        let blob = Blob::with_content(&[3u8; 400], &mut d).unwrap();
        assert_eq!(d.used(), 448);
        blob.clear(&mut d);
        assert_eq!(d.used(), 0);

        // Reused blocks do not leak the old content.
        let next = Blob::with_content(&[], &mut d).unwrap();
        assert_eq!(next.total_size(), 0);
        let space = d.allocate(512).unwrap();
        assert!(space.is_zeroed());
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn write_op() -> impl Strategy<Value = (Vec<u8>, bool)> {
        (proptest::collection::vec(any::<u8>(), 0..300), any::<bool>())
    }

    proptest! {
        #[test]
        fn writes_preserve_invariants(ops in proptest::collection::vec(write_op(), 1..20)) {
            let mut d = Disk::with_blocks(64, 64).unwrap();
            let mut blob = Blob::empty(&d);
            let mut model: Vec<u8> = Vec::new();
            for (content, append) in ops {
                let mode = if append { WriteMode::Append } else { WriteMode::Overwrite };
                if blob.write(&content, mode, &mut d).is_ok() {
                    if append {
                        model.extend_from_slice(&content);
                    } else {
                        model = content;
                    }
                }
                prop_assert_eq!(blob.total_size() % 64, 0);
                prop_assert!(blob.size() <= blob.total_size());
                prop_assert_eq!(blob.read_strict(), model.clone());
                prop_assert_eq!(d.available() + d.used(), d.total_capacity());
                prop_assert_eq!(d.used(), blob.total_size());
            }
        }

        #[test]
        fn lazy_and_strict_reads_agree(
            content in proptest::collection::vec(any::<u8>(), 0..500),
            a in any::<usize>(),
            b in any::<usize>(),
        ) {
            let mut d = Disk::with_blocks(16, 64).unwrap();
            let blob = Blob::with_content(&content, &mut d).unwrap();
            let size = blob.size();
            let offset = if size == 0 { 0 } else { a % (size + 1) };
            let n = if size == offset { 0 } else { b % (size - offset + 1) };
            let lazy: Vec<u8> = blob.read_range(offset, n).unwrap().collect();
            prop_assert_eq!(&lazy, &blob.read_strict_range(offset, n).unwrap());
            prop_assert_eq!(&lazy[..], &content[offset..offset + n]);
        }
    }
}
