//! Error types for segment and worker-pool operations.

use thiserror::Error;

/// Errors that can occur during segment, log, or pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Requested segment size is outside the supported range
    #[error("invalid segment size: {size} bytes (maximum {max})", max = crate::consts::SEGMENT_MAX_SIZE)]
    InvalidSize {
        /// Attempted size in bytes
        size: usize,
    },

    /// The record log has no room left for the record
    #[error("record log full: {needed} bytes needed, {remaining} remaining")]
    LogFull {
        /// Bytes the record would occupy (length word + payload)
        needed: usize,
        /// Bytes left between the write offset and the segment end
        remaining: usize,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// Nix system call error
    #[error("system call error: {source}")]
    Sys {
        /// Source nix error
        #[from]
        source: nix::Error,
    },
}

/// Result type for segment and worker-pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
