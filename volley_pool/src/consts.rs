//! Segment and record-log constants.
//!
//! These constants define the fundamental parameters of the shared-memory
//! channel between worker children and the supervising parent. They are the
//! single source of truth - the engine crate imports from here.

/// Minimum shared memory segment size in bytes.
///
/// Requested sizes below this are clamped up. 1 MiB keeps even small runs
/// from overflowing the log with a handful of discovered URLs.
pub const SEGMENT_MIN_SIZE: usize = 1024 * 1024;

/// Default shared memory segment size in bytes (16 MiB).
pub const SEGMENT_DEFAULT_SIZE: usize = 16 * 1024 * 1024;

/// Maximum shared memory segment size in bytes.
///
/// Set to 1GB as a reasonable upper limit to prevent excessive memory usage.
pub const SEGMENT_MAX_SIZE: usize = 1_073_741_824; // 1GB

/// Maximum payload length of a single log record in bytes.
///
/// Longer payloads are silently truncated on append. A length word above
/// this value can never have been written by the log and terminates a drain.
pub const RECORD_MAX_LEN: usize = 16 * 1024;

/// Size of the record length prefix: one platform word, host byte order.
pub const LENGTH_WORD_SIZE: usize = size_of::<usize>();

/// Default worker timeout in seconds for bare forks.
///
/// The engine overrides this with its own configured timeout; this value
/// only applies when a pool consumer forks without specifying one.
pub const DEFAULT_FORK_TIMEOUT_SECS: u32 = 90;

// A record header plus a maximal payload must always fit a minimal segment.
static_assertions::const_assert!(LENGTH_WORD_SIZE + RECORD_MAX_LEN < SEGMENT_MIN_SIZE);
static_assertions::const_assert!(SEGMENT_MIN_SIZE <= SEGMENT_DEFAULT_SIZE);
static_assertions::const_assert!(SEGMENT_DEFAULT_SIZE <= SEGMENT_MAX_SIZE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_cap_is_16k() {
        assert_eq!(RECORD_MAX_LEN, 16384);
    }

    #[test]
    fn size_constraints() {
        assert!(SEGMENT_MIN_SIZE < SEGMENT_MAX_SIZE);
        assert_eq!(SEGMENT_DEFAULT_SIZE, 16 * 1024 * 1024);
    }
}
