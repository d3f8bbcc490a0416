//! Fork-safe fan-out: workers write discovered URLs to shared memory, the
//! parent drains them in the finish hook.
//!
//! Single test function: the engine reaps with `waitpid(-1)`, so concurrent
//! fork tests in one binary could steal each other's children.

mod support;

use std::cell::RefCell;
use std::rc::Rc;
use support::{Mode, spawn};
use volley::{Engine, EngineConfig, ExitClass, Instruction};

#[test]
fn fanout_collects_every_url_through_shared_memory() {
    let server = spawn(Mode::Echo { status: 200 });
    const TOTAL: usize = 12;

    let mut config = EngineConfig::default();
    config.use_shm = true;
    config.shm_size = 1024 * 1024;
    config.timeout_seconds = 30;

    let mut engine = Engine::with_config(config);

    for n in 0..TOTAL {
        let mut i = Instruction::new("127.0.0.1", format!("/page/{n}"));
        i.port = server.port;
        i.expected_response_code = 200;
        i.set_after(|i, _easy, _response, ctx| {
            let url = format!("http://{}{}", i.host, i.path);
            let _ = ctx.append_str(&url);
        });
        engine.add_instruction(i);
    }

    let urls: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let outcomes: Rc<RefCell<Vec<ExitClass>>> = Rc::new(RefCell::new(Vec::new()));
    {
        let urls = Rc::clone(&urls);
        let outcomes = Rc::clone(&outcomes);
        engine.on_finish(move |worker| {
            let worker = worker.expect("fork mode reports a worker handle");
            outcomes.borrow_mut().push(worker.outcome());
            urls.borrow_mut().extend(worker.drain());
        });
    }

    engine.execute().expect("execute");

    // Every worker (including any with an empty slice) exited cleanly.
    let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let partitions = if TOTAL < cores { TOTAL - 1 } else { cores };
    assert_eq!(outcomes.borrow().len(), partitions + 1);
    assert!(outcomes.borrow().iter().all(|o| *o == ExitClass::Exited(0)));

    // All URLs made it back, each exactly once.
    let mut collected = urls.borrow().clone();
    collected.sort();
    collected.dedup();
    assert_eq!(collected.len(), TOTAL);
    for n in 0..TOTAL {
        assert!(collected.contains(&format!("http://127.0.0.1/page/{n}")));
    }
}
