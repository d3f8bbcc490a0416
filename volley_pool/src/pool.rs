//! Fork/reap worker pool with CPU pinning and SIGALRM timeouts.
//!
//! The pool owns the parent-side view of every forked worker: its PID, the
//! shared segment allocated for it before the fork, and its timeout. Children
//! get the inherited segment back from [`WorkerPool::fork_worker`] and are
//! expected to run their work and `exit(0)`; the parent reaps them through
//! [`WorkerPool::wait_any`] and releases per-child state with
//! [`WorkerPool::forget`].

use crate::consts::DEFAULT_FORK_TIMEOUT_SECS;
use crate::error::PoolResult;
use crate::segment::Segment;
use nix::errno::Errno;
use nix::sched::{CpuSet, sched_setaffinity};
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, alarm, fork, getpid};
use tracing::{debug, error, warn};

/// Options for a single [`WorkerPool::fork_worker`] call.
#[derive(Debug, Clone, Copy)]
pub struct ForkOptions {
    /// Bind the child to the pool's round-robin CPU cursor.
    pub pin_cpu: bool,
    /// Allocate a shared segment before forking.
    pub use_shm: bool,
    /// Requested segment size in bytes (clamped by [`Segment::create`]).
    pub shm_size: usize,
    /// Seconds until the child receives SIGALRM.
    pub timeout_secs: u32,
}

impl Default for ForkOptions {
    fn default() -> Self {
        Self {
            pin_cpu: false,
            use_shm: false,
            shm_size: crate::consts::SEGMENT_DEFAULT_SIZE,
            timeout_secs: DEFAULT_FORK_TIMEOUT_SECS,
        }
    }
}

/// Parent-side state for one forked worker.
pub struct WorkerHandle {
    pid: Pid,
    segment: Option<Segment>,
    timeout_secs: u32,
    cpu: Option<usize>,
}

impl WorkerHandle {
    /// The worker's PID.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// The worker's shared segment, if one was allocated.
    pub fn segment(&self) -> Option<&Segment> {
        self.segment.as_ref()
    }

    /// Take ownership of the worker's segment.
    pub fn take_segment(&mut self) -> Option<Segment> {
        self.segment.take()
    }

    /// The SIGALRM timeout the worker was armed with.
    pub fn timeout_secs(&self) -> u32 {
        self.timeout_secs
    }

    /// The CPU the worker was pinned to, if any.
    pub fn cpu(&self) -> Option<usize> {
        self.cpu
    }
}

/// What `fork_worker` returned on each side of the fork.
pub enum Forked {
    /// In the parent: the child's PID (the handle is tracked by the pool).
    Parent {
        /// PID of the new child.
        pid: Pid,
    },
    /// In the child: the inherited segment and the CPU it was bound to.
    Child {
        /// The child's view of the pre-fork segment.
        segment: Option<Segment>,
        /// CPU this child was pinned to, if pinning was requested.
        cpu: Option<usize>,
    },
}

/// Classification of a reaped child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    /// Normal exit with the given code.
    Exited(i32),
    /// Terminated by SIGALRM: the per-worker timeout fired.
    TimedOut,
    /// Terminated by some other signal.
    Signaled {
        /// The terminating signal.
        signal: Signal,
        /// Whether the child dumped core.
        core_dumped: bool,
    },
}

/// One result from [`WorkerPool::wait_any`].
#[derive(Debug, Clone, Copy)]
pub struct WaitOutcome {
    /// PID of the reaped child.
    pub pid: Pid,
    /// How it terminated.
    pub status: ExitClass,
}

/// Parent-side pool of forked workers.
pub struct WorkerPool {
    parent_pid: Pid,
    is_parent: bool,
    cores: usize,
    cpu_cursor: usize,
    children: Vec<WorkerHandle>,
}

impl WorkerPool {
    /// Create an empty pool in the current (parent) process.
    pub fn new() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            parent_pid: getpid(),
            is_parent: true,
            cores,
            cpu_cursor: 0,
            children: Vec::new(),
        }
    }

    /// Number of CPU cores the pool partitions work across.
    pub fn cores(&self) -> usize {
        self.cores
    }

    /// Whether this process is the parent (false after fork, in the child).
    pub fn is_parent(&self) -> bool {
        self.is_parent
    }

    /// PID of the process that created the pool.
    pub fn parent_pid(&self) -> Pid {
        self.parent_pid
    }

    /// Number of live (unreaped, unforgotten) children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Parent-side handle for a child PID.
    pub fn handle_mut(&mut self, pid: Pid) -> Option<&mut WorkerHandle> {
        self.children.iter_mut().find(|c| c.pid == pid)
    }

    /// Fork one worker.
    ///
    /// When `opts.use_shm` is set the segment is allocated (and thereby
    /// mapped) before the fork so both sides observe it; allocation failure
    /// is fatal - the engine cannot recover the loss of its IPC channel.
    ///
    /// In the parent the child handle is recorded and, when pinning, the
    /// round-robin CPU cursor advances. In the child the sibling list is
    /// cleared, the cursor's CPU is bound, and a SIGALRM timer is armed.
    pub fn fork_worker(&mut self, opts: ForkOptions) -> PoolResult<Forked> {
        let segment = if opts.use_shm {
            match Segment::create(opts.shm_size) {
                Ok(s) => Some(s),
                Err(e) => {
                    error!("could not allocate {} bytes of shared memory: {e}", opts.shm_size);
                    std::process::abort();
                }
            }
        } else {
            None
        };

        let cpu = opts.pin_cpu.then_some(self.cpu_cursor);

        // Safety: the child only runs the caller's worker body and exits; the
        // pool itself performs no allocation between fork and return.
        match unsafe { fork() }? {
            ForkResult::Parent { child } => {
                debug!(pid = child.as_raw(), ?cpu, "worker forked");

                self.children.push(WorkerHandle {
                    pid: child,
                    segment,
                    timeout_secs: opts.timeout_secs,
                    cpu,
                });

                if opts.pin_cpu {
                    self.cpu_cursor += 1;
                    if self.cpu_cursor >= self.cores {
                        self.cpu_cursor = 0;
                    }
                }

                Ok(Forked::Parent { pid: child })
            }
            ForkResult::Child => {
                self.is_parent = false;
                self.children.clear();

                if let Some(cpu) = cpu {
                    if let Err(e) = set_affinity(cpu, self.cores) {
                        warn!("failed to bind worker {} to CPU {cpu}: {e}", getpid());
                    }
                }

                alarm::set(opts.timeout_secs);

                Ok(Forked::Child { segment, cpu })
            }
        }
    }

    /// Block until any child changes state and classify the transition.
    ///
    /// Stopped/continued children are not terminal and keep the wait going.
    /// Returns `None` once no children remain.
    pub fn wait_any(&mut self) -> Option<WaitOutcome> {
        loop {
            match waitpid(None::<Pid>, None) {
                Ok(WaitStatus::Exited(pid, code)) => {
                    debug!(pid = pid.as_raw(), code, "child exited");
                    return Some(WaitOutcome {
                        pid,
                        status: ExitClass::Exited(code),
                    });
                }
                Ok(WaitStatus::Signaled(pid, signal, core_dumped)) => {
                    if core_dumped {
                        warn!(pid = pid.as_raw(), %signal, "child dumped core");
                    }

                    let status = if signal == Signal::SIGALRM {
                        debug!(pid = pid.as_raw(), "child timed out");
                        ExitClass::TimedOut
                    } else {
                        debug!(pid = pid.as_raw(), %signal, "child killed by signal");
                        ExitClass::Signaled {
                            signal,
                            core_dumped,
                        }
                    };

                    return Some(WaitOutcome { pid, status });
                }
                Ok(_) => continue, // stopped/continued: not terminal
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => return None,
                Err(e) => {
                    warn!("waitpid failed: {e}");
                    return None;
                }
            }
        }
    }

    /// Drop the handle for a reaped child, releasing its segment.
    ///
    /// Returns the handle so the caller can drain the segment first.
    /// Idempotent: unknown PIDs return `None`.
    pub fn forget(&mut self, pid: Pid) -> Option<WorkerHandle> {
        let idx = self.children.iter().position(|c| c.pid == pid)?;
        Some(self.children.swap_remove(idx))
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Bind the current process to one CPU.
///
/// CPUs beyond the last core wrap to 0, matching the round-robin cursor.
fn set_affinity(cpu: usize, cores: usize) -> PoolResult<()> {
    let cpu = if cpu >= cores { 0 } else { cpu };

    let mut cpuset = CpuSet::new();
    cpuset.set(cpu)?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)?;

    Ok(())
}
