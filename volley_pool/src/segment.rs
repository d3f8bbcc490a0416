//! Shared memory segment wrapper.

use crate::consts::{SEGMENT_MAX_SIZE, SEGMENT_MIN_SIZE};
use crate::error::{PoolError, PoolResult};
use crate::platform::create_shared_mmap;
use memmap2::MmapMut;

/// A contiguous shared byte region, mapped before fork so that parent and
/// child observe the same pages.
///
/// The child writes its record log into the segment; the parent reads it back
/// after the child has been reaped. The fork/reap barrier is the only
/// synchronization - the two sides never touch the segment concurrently.
/// Dropping the last handle releases the memory, so destruction is idempotent
/// by construction.
pub struct Segment {
    map: MmapMut,
    size: usize,
}

impl Segment {
    /// Create a segment of at least `size` bytes.
    ///
    /// Sizes below [`SEGMENT_MIN_SIZE`] are clamped up; sizes above
    /// [`SEGMENT_MAX_SIZE`] are rejected. The fresh mapping is zero-filled,
    /// which doubles as the record log's terminator.
    pub fn create(size: usize) -> PoolResult<Self> {
        if size > SEGMENT_MAX_SIZE {
            return Err(PoolError::InvalidSize { size });
        }

        let size = size.max(SEGMENT_MIN_SIZE);
        let map = create_shared_mmap(size)?;

        Ok(Self { map, size })
    }

    /// Total segment size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The segment contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.map[..self.size]
    }

    /// Mutable view of the segment contents (writer side only).
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.map[..self.size]
    }
}
