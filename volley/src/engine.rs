//! Top-level engine: validation, partitioning, worker supervision.

use crate::config::EngineConfig;
use crate::context::WorkerContext;
use crate::error::{EngineError, EngineResult};
use crate::instruction::Instruction;
use crate::worker;
use nix::unistd::Pid;
use std::collections::VecDeque;
use std::ops::Range;
use tracing::{debug, error, warn};
use volley_pool::{ExitClass, ForkOptions, Forked, RecordLog, Segment, WorkerPool};

/// Environment variable that forces the fork path even when `fork_safe` is
/// off. Useful for flipping a deployment to fork mode without a rebuild.
pub const FORCE_FORK_ENV: &str = "VOLLEY_FORCE_FORK";

/// A reaped worker, handed to the finish hook while its shared segment is
/// still alive on the parent side.
pub struct ReapedWorker {
    pid: Pid,
    outcome: ExitClass,
    segment: Option<Segment>,
}

impl ReapedWorker {
    /// PID the worker ran under.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// How the worker terminated.
    pub fn outcome(&self) -> ExitClass {
        self.outcome
    }

    /// The worker's shared segment, when the run used shared memory.
    pub fn segment(&self) -> Option<&Segment> {
        self.segment.as_ref()
    }

    /// Walk the records the worker appended.
    pub fn records(&self) -> impl Iterator<Item = &[u8]> {
        self.segment.iter().flat_map(|s| volley_pool::records(s))
    }

    /// Drain the worker's records into owned strings.
    pub fn drain(&self) -> Vec<String> {
        match &self.segment {
            Some(segment) => volley_pool::drain(segment),
            None => Vec::new(),
        }
    }
}

/// Parent-side hook fired once per reaped worker (clean exit or timeout).
/// Receives `None` when there is no worker handle to report, e.g. for an
/// in-process run.
pub type FinishHook = Box<dyn FnMut(Option<&mut ReapedWorker>)>;

/// The fan-out engine.
///
/// Collects [`Instruction`]s, then `execute` partitions them across forked
/// workers (or runs them in-process), supervises the workers and reports each
/// one through the finish hook.
pub struct Engine {
    instructions: Vec<Instruction>,
    config: EngineConfig,
    finish: Option<FinishHook>,
    pool: WorkerPool,
}

impl Engine {
    /// Engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Engine with an explicit configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            instructions: Vec::new(),
            config,
            finish: None,
            pool: WorkerPool::new(),
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Mutable access to the engine configuration.
    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    /// Queue a descriptor for the next `execute`.
    pub fn add_instruction(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Drop all queued descriptors.
    pub fn clear_instructions(&mut self) {
        self.instructions.clear();
    }

    /// Number of descriptors currently queued.
    pub fn pending(&self) -> usize {
        self.instructions.len()
    }

    /// Register the per-worker finish hook.
    pub fn on_finish(&mut self, hook: impl FnMut(Option<&mut ReapedWorker>) + 'static) {
        self.finish = Some(Box::new(hook));
    }

    /// Run every queued descriptor to completion.
    ///
    /// Descriptors are consumed: each one is dispatched by exactly one worker
    /// and dropped when its transfer completes (or lost with its worker on
    /// timeout). The engine keeps no state between executions.
    pub fn execute(&mut self) -> EngineResult<()> {
        curl::init();

        if self.instructions.is_empty() {
            return Err(EngineError::EmptyBatch);
        }

        for instruction in &self.instructions {
            if instruction.host.is_empty() {
                return Err(EngineError::InvalidInstruction {
                    reason: "empty host".to_string(),
                });
            }
        }

        let fork_requested =
            self.config.fork_safe || std::env::var_os(FORCE_FORK_ENV).is_some();

        if fork_requested && !self.config.slow_parallel {
            self.execute_forked()
        } else if fork_requested {
            self.execute_slow_parallel()
        } else {
            self.execute_in_process()
        }
    }

    /// Fast mode: C+1 workers, each over one slice of the batch.
    fn execute_forked(&mut self) -> EngineResult<()> {
        let total = self.instructions.len();
        let ranges = partition(total, self.pool.cores());
        let mut batches = split_batches(std::mem::take(&mut self.instructions), &ranges);

        debug!(total, workers = batches.len(), "forking workers");

        for (worker_index, slot) in batches.iter_mut().enumerate() {
            match self.pool.fork_worker(self.fork_options()) {
                Err(e) => warn!(worker = worker_index, "failed to fork: {e}"),
                Ok(Forked::Parent { .. }) => {}
                Ok(Forked::Child { segment, .. }) => {
                    let batch = slot.take().unwrap_or_default();
                    run_worker(worker_index, batch, segment);
                }
            }
        }

        // The children carry their own copies of the batches.
        drop(batches);

        self.wait_loop();
        Ok(())
    }

    /// Slow mode: one descriptor per worker, in rounds of up to C+1 forks.
    ///
    /// A SIGALRM timeout loses at most one descriptor.
    fn execute_slow_parallel(&mut self) -> EngineResult<()> {
        let total = self.instructions.len();
        let cores = self.pool.cores();
        let partitions = if total < cores { total - 1 } else { cores };
        let per_round = partitions + 1;

        let mut queue: VecDeque<Instruction> =
            std::mem::take(&mut self.instructions).into();

        while !queue.is_empty() {
            let round = per_round.min(queue.len());

            for _ in 0..round {
                let instruction = queue.pop_front().expect("round <= queue length");

                match self.pool.fork_worker(self.fork_options()) {
                    // The popped descriptor is lost, like a timed-out one.
                    Err(e) => warn!("failed to fork: {e}"),
                    Ok(Forked::Parent { .. }) => {}
                    Ok(Forked::Child { segment, .. }) => {
                        run_worker(0, vec![instruction], segment);
                    }
                }
            }

            self.wait_loop();
        }

        Ok(())
    }

    /// No fork: the whole batch runs on the calling process, and the finish
    /// hook fires once with no worker handle.
    fn execute_in_process(&mut self) -> EngineResult<()> {
        let batch = std::mem::take(&mut self.instructions);
        let mut ctx = WorkerContext::new(0, None);

        worker::run_batch(batch, &mut ctx)?;

        if let Some(finish) = self.finish.as_mut() {
            finish(None);
        }

        Ok(())
    }

    /// Reap children until none remain, firing the finish hook for every
    /// clean exit or timeout. Other deaths are logged and discarded.
    fn wait_loop(&mut self) {
        while let Some(outcome) = self.pool.wait_any() {
            let clean = matches!(outcome.status, ExitClass::Exited(0) | ExitClass::TimedOut);

            match self.pool.forget(outcome.pid) {
                Some(mut handle) if clean => {
                    if let Some(finish) = self.finish.as_mut() {
                        let mut reaped = ReapedWorker {
                            pid: outcome.pid,
                            outcome: outcome.status,
                            segment: handle.take_segment(),
                        };
                        finish(Some(&mut reaped));
                    }
                }
                Some(_) => {
                    debug!(
                        pid = outcome.pid.as_raw(),
                        status = ?outcome.status,
                        "worker discarded without finish hook"
                    );
                }
                None => {
                    warn!(pid = outcome.pid.as_raw(), "reaped unknown child");
                    if clean {
                        if let Some(finish) = self.finish.as_mut() {
                            finish(None);
                        }
                    }
                }
            }
        }
    }

    fn fork_options(&self) -> ForkOptions {
        ForkOptions {
            pin_cpu: self.config.pin_cpu,
            use_shm: self.config.use_shm,
            shm_size: self.config.shm_size,
            timeout_secs: self.config.timeout_seconds,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Child-side body: run the batch, log failures, always exit 0 so the parent
/// classifies the worker as a clean exit and drains its segment.
fn run_worker(worker_index: usize, batch: Vec<Instruction>, segment: Option<Segment>) -> ! {
    let mut ctx = WorkerContext::new(worker_index, segment.map(RecordLog::new));

    if let Err(e) = worker::run_batch(batch, &mut ctx) {
        error!(worker = worker_index, "worker engine error: {e}");
    }

    std::process::exit(0);
}

/// Partition `total` descriptors over `cores` CPUs.
///
/// `C = cores`, clamped to `total - 1` when the batch is smaller than the
/// machine; `C + 1` workers each take a stride of `total / C`, and the last
/// worker absorbs the tail. A single descriptor yields a single worker.
pub(crate) fn partition(total: usize, cores: usize) -> Vec<Range<usize>> {
    debug_assert!(total > 0);

    let partitions = if total < cores { total - 1 } else { cores };

    if partitions == 0 {
        return vec![0..total];
    }

    let stride = total / partitions;

    (0..=partitions)
        .map(|w| {
            let start = (w * stride).min(total);
            let end = if w == partitions {
                total
            } else {
                ((w + 1) * stride).min(total)
            };
            start..end.max(start)
        })
        .collect()
}

/// Split a drained instruction list into per-worker batches matching
/// `ranges` (which must be contiguous and ascending, as `partition` emits).
fn split_batches(
    mut instructions: Vec<Instruction>,
    ranges: &[Range<usize>],
) -> Vec<Option<Vec<Instruction>>> {
    let mut batches = Vec::with_capacity(ranges.len());

    for range in ranges.iter().rev() {
        batches.push(Some(instructions.split_off(range.start)));
    }

    batches.reverse();
    batches
}
