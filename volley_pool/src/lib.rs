//! # volley_pool
//!
//! Shared-memory IPC log and fork/reap worker pool: the process-level
//! foundation of the volley fan-out engine.
//!
//! Two pieces live here:
//!
//! - **[`Segment`] / [`RecordLog`]** - a contiguous shared mapping created
//!   before `fork()` and a single-writer, length-prefixed record log inside
//!   it. The worker child appends discovered values; the parent drains them
//!   after the reap. No locks: the fork/reap barrier is the synchronization.
//! - **[`WorkerPool`]** - forks worker children with optional CPU pinning and
//!   a SIGALRM wall-clock timeout, then reaps and classifies their exits.
//!
//! ## Record format
//!
//! ```text
//! record     := length_word | payload
//! length_word := unsigned platform word, host byte order
//! terminator := length_word == 0
//! ```
//!
//! Payloads are capped at [`consts::RECORD_MAX_LEN`] (16 KiB). Readers stop
//! at the terminator or at the segment end.
//!
//! ## Example
//!
//! ```rust
//! use volley_pool::{RecordLog, Segment, drain};
//!
//! # fn main() -> Result<(), volley_pool::PoolError> {
//! let mut log = RecordLog::new(Segment::create(1024 * 1024)?);
//! log.append_str("https://example.test/found")?;
//!
//! let seg = log.into_segment();
//! assert_eq!(drain(&seg), vec!["https://example.test/found"]);
//! # Ok(())
//! # }
//! ```
//!
//! Cross-process use is the same, with a `fork()` in the middle: see
//! [`WorkerPool::fork_worker`].

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod consts;
pub mod error;
pub mod log;
mod platform;
pub mod pool;
pub mod segment;

pub use consts::{RECORD_MAX_LEN, SEGMENT_DEFAULT_SIZE, SEGMENT_MAX_SIZE, SEGMENT_MIN_SIZE};
pub use error::{PoolError, PoolResult};
pub use log::{RecordLog, Records, drain, records};
pub use pool::{ExitClass, ForkOptions, Forked, WaitOutcome, WorkerHandle, WorkerPool};
pub use segment::Segment;
