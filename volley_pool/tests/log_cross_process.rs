//! Child writes the record log, parent drains it after the reap.

use volley_pool::{ExitClass, ForkOptions, Forked, RecordLog, WorkerPool, drain};

#[test]
fn child_records_are_visible_to_the_parent_after_reap() {
    let mut pool = WorkerPool::new();

    let opts = ForkOptions {
        use_shm: true,
        shm_size: volley_pool::SEGMENT_MIN_SIZE,
        timeout_secs: 30,
        ..ForkOptions::default()
    };

    let child_pid = match pool.fork_worker(opts).expect("fork") {
        Forked::Child { segment, .. } => {
            // Child: write 100 records and exit cleanly.
            let mut log = RecordLog::new(segment.expect("child segment"));
            for n in 0..100 {
                log.append_str(&format!("record-{n}")).expect("append");
            }
            std::process::exit(0);
        }
        Forked::Parent { pid } => pid,
    };

    // Parent: reap the child, then drain its segment.
    let outcome = pool.wait_any().expect("a child to reap");
    assert_eq!(outcome.pid, child_pid);
    assert_eq!(outcome.status, ExitClass::Exited(0));

    let mut handle = pool.forget(outcome.pid).expect("tracked child");
    let segment = handle.take_segment().expect("segment survives the child");

    let strings = drain(&segment);
    assert_eq!(strings.len(), 100);
    for (n, s) in strings.iter().enumerate() {
        assert_eq!(s, &format!("record-{n}"));
    }

    // Nothing left to reap.
    assert!(pool.wait_any().is_none());
}
