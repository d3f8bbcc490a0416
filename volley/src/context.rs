//! The narrow per-worker state handed to hooks.

use volley_pool::{PoolResult, RecordLog};

/// What a hook may reach beyond its own descriptor: the worker's index and
/// its shared-memory record log, when one was allocated.
///
/// Descriptors hold no reference back into the engine; this context is passed
/// into `before`/`after` instead.
pub struct WorkerContext {
    worker_index: usize,
    log: Option<RecordLog>,
}

impl WorkerContext {
    /// Build the context for one worker.
    pub fn new(worker_index: usize, log: Option<RecordLog>) -> Self {
        Self { worker_index, log }
    }

    /// Index of this worker within the run's partition.
    pub fn worker_index(&self) -> usize {
        self.worker_index
    }

    /// Whether a shared-memory log is attached.
    pub fn has_log(&self) -> bool {
        self.log.is_some()
    }

    /// Append a record to the worker's log.
    ///
    /// A no-op when the engine runs without shared memory, so hooks can call
    /// it unconditionally.
    pub fn append(&mut self, bytes: &[u8]) -> PoolResult<()> {
        match &mut self.log {
            Some(log) => log.append(bytes),
            None => Ok(()),
        }
    }

    /// Append a string record to the worker's log.
    pub fn append_str(&mut self, s: &str) -> PoolResult<()> {
        self.append(s.as_bytes())
    }

    /// Direct access to the record log.
    pub fn log_mut(&mut self) -> Option<&mut RecordLog> {
        self.log.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_pool::{RecordLog, SEGMENT_MIN_SIZE, Segment, drain};

    #[test]
    fn append_without_log_is_a_noop() {
        let mut ctx = WorkerContext::new(0, None);
        assert!(!ctx.has_log());
        assert!(ctx.append_str("dropped").is_ok());
    }

    #[test]
    fn append_with_log_records() {
        let log = RecordLog::new(Segment::create(SEGMENT_MIN_SIZE).unwrap());
        let mut ctx = WorkerContext::new(3, Some(log));

        ctx.append_str("kept").unwrap();
        assert_eq!(ctx.worker_index(), 3);

        let log = ctx.log_mut().unwrap();
        assert_eq!(drain(log.segment()), vec!["kept"]);
    }
}
