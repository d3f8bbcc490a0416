//! # volley
//!
//! A library for issuing very large numbers of HTTP(S) requests concurrently
//! across a pool of worker processes, collecting results through shared
//! memory.
//!
//! The engine takes a flat list of request descriptors ([`Instruction`]),
//! partitions them over the machine's cores, forks one worker per partition
//! and drives each worker's slice through a single multiplexed curl client.
//! Workers are supervised with per-worker SIGALRM timeouts and optional CPU
//! pinning; anything a worker discovers travels back to the parent through a
//! length-prefixed record log in shared memory ([`WorkerContext::append`],
//! drained in the [`Engine::on_finish`] hook).
//!
//! ## Hooks
//!
//! - `before(descriptor, handle, ctx)` - runs on the worker right before
//!   dispatch; may set final options on the live client handle.
//! - `after(descriptor, handle, response, ctx)` - runs on the worker when the
//!   transfer completed and the response code passed the descriptor's filter;
//!   the response is freed as soon as the hook returns.
//! - `finish(reaped_worker)` - runs in the parent for every worker that
//!   exited cleanly or timed out, with the worker's shared segment still
//!   attached.
//!
//! ## Example
//!
//! ```rust,no_run
//! use volley::{Engine, Instruction};
//!
//! # fn main() -> Result<(), volley::EngineError> {
//! let mut engine = Engine::new();
//! engine.config_mut().use_shm = true;
//!
//! for n in 0..1000 {
//!     let mut i = Instruction::new("example.test", format!("/page/{n}"));
//!     i.expected_response_code = 200;
//!     i.set_after(|i, _easy, _response, ctx| {
//!         let _ = ctx.append_str(&format!("found http://{}{}", i.host, i.path));
//!     });
//!     engine.add_instruction(i);
//! }
//!
//! engine.on_finish(|worker| {
//!     if let Some(worker) = worker {
//!         for hit in worker.drain() {
//!             println!("{hit}");
//!         }
//!     }
//! });
//!
//! engine.execute()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Operating modes
//!
//! - **Fork-safe (default)** - `C + 1` workers over `N` descriptors; a
//!   worker timeout loses that worker's remaining slice.
//! - **Slow parallel** - one descriptor per worker, forked in rounds; a
//!   timeout loses at most one descriptor.
//! - **In-process** - `fork_safe = false`; the batch runs on the calling
//!   thread and `finish` fires once with no worker handle.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod instruction;
pub mod transfer;
mod worker;

pub use config::EngineConfig;
pub use context::WorkerContext;
pub use engine::{Engine, FORCE_FORK_ENV, FinishHook, ReapedWorker};
pub use error::{EngineError, EngineResult};
pub use instruction::{
    AfterHook, BeforeHook, DEFAULT_USER_AGENT, Instruction, Method, Response,
};
pub use transfer::ResponseSink;

// The pool layer is part of the public surface: finish hooks and custom
// consumers work with segments and exit classifications directly.
pub use volley_pool::{ExitClass, PoolError, RecordLog, Segment, drain, records};

/// Install a `tracing` subscriber reading `RUST_LOG`-style filters from the
/// environment. Convenience for binaries and examples; libraries embedding
/// the engine will usually install their own.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
