//! Linux-specific shared memory mapping helpers.

use crate::error::PoolResult;
use memmap2::{MmapMut, MmapOptions};
use nix::unistd::getpid;
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-process counter so concurrent allocations never collide on a path.
static SEGMENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Create a shared anonymous-equivalent memory mapping.
///
/// The mapping is backed by a freshly created file under `/dev/shm` which is
/// unlinked as soon as the mapping exists. After that the mapping itself is
/// the only handle: it is inherited across `fork()` (both sides observe the
/// same pages) and released when the last mapping is dropped.
pub(crate) fn create_shared_mmap(size: usize) -> PoolResult<MmapMut> {
    let seq = SEGMENT_SEQ.fetch_add(1, Ordering::Relaxed);
    let path = format!("/dev/shm/volley_{}_{}", getpid().as_raw(), seq);

    let file = OpenOptions::new()
        .create_new(true) // Fail if already exists
        .read(true)
        .write(true)
        .mode(0o600) // Owner read/write only
        .open(&path)?;

    file.set_len(size as u64)?;

    let mmap = unsafe { MmapOptions::new().map_mut(&file)? };

    // The mapping keeps the pages alive; the name is no longer needed.
    std::fs::remove_file(&path)?;

    Ok(mmap)
}
