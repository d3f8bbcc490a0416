//! Minimal fan-out run: request many paths from one host, collect every URL
//! that answered 200 through shared memory.
//!
//! ```bash
//! cargo run --example fanout -- example.com
//! ```

use volley::{Engine, Instruction};

fn main() -> Result<(), volley::EngineError> {
    volley::init_tracing();

    let host = std::env::args().nth(1).unwrap_or_else(|| "example.com".to_string());

    let mut engine = Engine::new();
    engine.config_mut().use_shm = true;
    engine.config_mut().timeout_seconds = 20;

    for path in ["/", "/index.html", "/robots.txt", "/favicon.ico", "/sitemap.xml"] {
        let mut i = Instruction::new(host.as_str(), path);
        i.expected_response_code = 200;
        i.set_after(|i, _easy, response, ctx| {
            let _ = ctx.append_str(&format!(
                "http://{}{} ({} bytes)",
                i.host,
                i.path,
                response.len()
            ));
        });
        engine.add_instruction(i);
    }

    engine.on_finish(|worker| {
        let Some(worker) = worker else { return };
        for hit in worker.drain() {
            println!("{hit}");
        }
    });

    engine.execute()
}
