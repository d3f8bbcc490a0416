//! Exit classification across real forks.
//!
//! Single test function: `wait_any` reaps with `waitpid(-1)`, so concurrent
//! fork tests in one binary could steal each other's children.

use nix::sys::signal::{Signal, kill};
use std::time::Duration;
use volley_pool::{ExitClass, ForkOptions, Forked, WorkerPool};

#[test]
fn wait_any_classifies_exits_timeouts_and_signals() {
    let mut pool = WorkerPool::new();

    // Child 1: exits with a distinctive code.
    let exit_pid = match pool.fork_worker(ForkOptions::default()).expect("fork") {
        Forked::Child { .. } => {
            std::process::exit(7);
        }
        Forked::Parent { pid } => pid,
    };

    // Child 2: sleeps past a 1 second SIGALRM timeout.
    let timeout_pid = match pool
        .fork_worker(ForkOptions {
            timeout_secs: 1,
            ..ForkOptions::default()
        })
        .expect("fork")
    {
        Forked::Child { .. } => {
            std::thread::sleep(Duration::from_secs(60));
            std::process::exit(0);
        }
        Forked::Parent { pid } => pid,
    };

    // Child 3: killed by the parent.
    let killed_pid = match pool.fork_worker(ForkOptions::default()).expect("fork") {
        Forked::Child { .. } => {
            std::thread::sleep(Duration::from_secs(60));
            std::process::exit(0);
        }
        Forked::Parent { pid } => pid,
    };

    assert_eq!(pool.child_count(), 3);
    kill(killed_pid, Signal::SIGKILL).expect("kill");

    let mut saw_exit = false;
    let mut saw_timeout = false;
    let mut saw_signal = false;

    while let Some(outcome) = pool.wait_any() {
        if outcome.pid == exit_pid {
            assert_eq!(outcome.status, ExitClass::Exited(7));
            saw_exit = true;
        } else if outcome.pid == timeout_pid {
            assert_eq!(outcome.status, ExitClass::TimedOut);
            saw_timeout = true;
        } else if outcome.pid == killed_pid {
            assert!(matches!(
                outcome.status,
                ExitClass::Signaled {
                    signal: Signal::SIGKILL,
                    ..
                }
            ));
            saw_signal = true;
        } else {
            panic!("reaped unexpected pid {}", outcome.pid);
        }

        assert!(pool.forget(outcome.pid).is_some());
        // Forgetting again is a no-op.
        assert!(pool.forget(outcome.pid).is_none());
    }

    assert!(saw_exit && saw_timeout && saw_signal);
    assert_eq!(pool.child_count(), 0);
}
