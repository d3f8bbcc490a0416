//! Length-prefixed record log inside a shared segment.
//!
//! The log is a sequence of `(length, payload)` records written head-first
//! into the segment by a single writer (the worker child). The length prefix
//! is one platform word in host byte order; a zero length word terminates the
//! log. Because a fresh segment is zero-filled the terminator is implicit.
//!
//! Writers and readers never overlap in wall time for a given segment: the
//! child writes before it exits, the parent drains after the reap.

use crate::consts::{LENGTH_WORD_SIZE, RECORD_MAX_LEN};
use crate::error::{PoolError, PoolResult};
use crate::segment::Segment;

/// Single-writer append handle over an owned segment.
pub struct RecordLog {
    segment: Segment,
    write_offset: usize,
}

impl RecordLog {
    /// Take ownership of a (fresh) segment and start appending at offset 0.
    pub fn new(segment: Segment) -> Self {
        Self {
            segment,
            write_offset: 0,
        }
    }

    /// Append one record.
    ///
    /// Payloads longer than [`RECORD_MAX_LEN`] are silently truncated to the
    /// cap. Empty payloads are a no-op (a zero length word is the
    /// terminator). When the record does not fit in the remaining space the
    /// append fails without a partial write.
    pub fn append(&mut self, bytes: &[u8]) -> PoolResult<()> {
        let len = bytes.len().min(RECORD_MAX_LEN);

        if len == 0 {
            return Ok(());
        }

        let needed = LENGTH_WORD_SIZE + len;
        let remaining = self.segment.size() - self.write_offset;

        if needed > remaining {
            return Err(PoolError::LogFull { needed, remaining });
        }

        let buf = self.segment.as_mut_slice();
        let start = self.write_offset;
        buf[start..start + LENGTH_WORD_SIZE].copy_from_slice(&len.to_ne_bytes());
        buf[start + LENGTH_WORD_SIZE..start + needed].copy_from_slice(&bytes[..len]);

        self.write_offset += needed;

        Ok(())
    }

    /// Append a string record (`append` over its UTF-8 bytes).
    pub fn append_str(&mut self, s: &str) -> PoolResult<()> {
        self.append(s.as_bytes())
    }

    /// Bytes written so far, including length prefixes.
    pub fn bytes_used(&self) -> usize {
        self.write_offset
    }

    /// Read access to the underlying segment.
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// Give the segment back, e.g. to hand it to a reader.
    pub fn into_segment(self) -> Segment {
        self.segment
    }
}

/// Iterator over the records of a drained segment.
///
/// Stops at the zero terminator, at a length word that cannot have been
/// written by [`RecordLog::append`] (`> RECORD_MAX_LEN`), or at any record
/// that would cross the segment end.
pub struct Records<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Records<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.offset + LENGTH_WORD_SIZE > self.buf.len() {
            return None;
        }

        let mut word = [0u8; LENGTH_WORD_SIZE];
        word.copy_from_slice(&self.buf[self.offset..self.offset + LENGTH_WORD_SIZE]);
        let len = usize::from_ne_bytes(word);

        if len == 0 || len > RECORD_MAX_LEN {
            return None;
        }

        let start = self.offset + LENGTH_WORD_SIZE;
        let end = start + len;

        if end > self.buf.len() {
            return None;
        }

        self.offset = end;
        Some(&self.buf[start..end])
    }
}

/// Walk the records of a segment from offset 0.
pub fn records(segment: &Segment) -> Records<'_> {
    Records {
        buf: segment.as_slice(),
        offset: 0,
    }
}

/// Drain a segment into owned strings (lossy UTF-8).
pub fn drain(segment: &Segment) -> Vec<String> {
    records(segment)
        .map(|r| String::from_utf8_lossy(r).into_owned())
        .collect()
}
