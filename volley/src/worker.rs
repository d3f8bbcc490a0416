//! Per-worker engine: drives one slice of instructions through a single
//! multiplexed curl client.
//!
//! Each worker owns one `Multi` handle and a pool of reusable easy handles.
//! Instructions dispatch in submission order; transfers complete in network
//! order; `after` hooks fire in completion order. Handles are reset (options
//! cleared, connection cache kept) and pooled when their transfer finishes.

use crate::context::WorkerContext;
use crate::error::EngineResult;
use crate::instruction::{Instruction, Response};
use crate::transfer::{ResponseSink, apply_options, compose_url};
use curl::easy::Easy2;
use curl::multi::{Easy2Handle, Multi};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Whether an observed response code passes a descriptor's filter.
fn response_matches(expected: u32, observed: u32) -> bool {
    expected == 0 || expected == observed
}

/// Run a batch of instructions to completion on this process.
pub(crate) fn run_batch(batch: Vec<Instruction>, ctx: &mut WorkerContext) -> EngineResult<()> {
    if batch.is_empty() {
        return Ok(());
    }

    let multi = Multi::new();
    let mut idle: Vec<Easy2<ResponseSink>> = Vec::new();
    let mut active: HashMap<usize, Easy2Handle<ResponseSink>> = HashMap::new();

    for (token, mut instruction) in batch.into_iter().enumerate() {
        instruction.normalize();
        let url = compose_url(&instruction);

        let mut easy = idle
            .pop()
            .unwrap_or_else(|| Easy2::new(ResponseSink::new()));
        apply_options(&mut easy, &instruction, &url)?;

        // The hook may apply final client options on the live handle.
        if let Some(mut hook) = instruction.before.take() {
            hook(&mut instruction, &mut easy, ctx);
            instruction.before = Some(hook);
        }

        debug!(
            worker = ctx.worker_index(),
            method = instruction.method.as_str(),
            url,
            "dispatching"
        );

        easy.get_mut().load(instruction);

        let mut handle = multi.add2(easy)?;
        handle.set_token(token)?;
        active.insert(token, handle);
    }

    while !active.is_empty() {
        multi.perform()?;

        // Drain the done queue.
        let mut done: Vec<(usize, Option<Result<(), curl::Error>>)> = Vec::new();
        multi.messages(|msg| {
            if let Ok(token) = msg.token() {
                let result = active.get(&token).and_then(|h| msg.result_for2(h));
                done.push((token, result));
            }
        });

        for (token, result) in done {
            let Some(handle) = active.remove(&token) else {
                continue;
            };

            let mut easy = multi.remove2(handle)?;
            complete_transfer(&mut easy, result, ctx);

            // Reset keeps the connection cache, so the pooled handle can
            // reuse keep-alive connections.
            easy.reset();
            idle.push(easy);
        }

        if active.is_empty() {
            break;
        }

        let timeout = match multi.get_timeout()? {
            Some(t) if t > Duration::ZERO => t,
            Some(_) => Duration::from_millis(1),
            None => Duration::from_millis(100),
        };
        multi.wait(&mut [], timeout)?;
    }

    Ok(())
}

/// Handle one finished transfer: recover the descriptor, record the transport
/// outcome, run the `after` hook when the filter accepts, free the response.
fn complete_transfer(
    easy: &mut Easy2<ResponseSink>,
    result: Option<Result<(), curl::Error>>,
    ctx: &mut WorkerContext,
) {
    let observed = easy.response_code().unwrap_or(0);
    let transport_ok = matches!(result, Some(Ok(())));

    let (instruction, body) = easy.get_mut().unload();
    let Some(mut instruction) = instruction else {
        return;
    };

    instruction.transport_result = result;

    if transport_ok && response_matches(instruction.expected_response_code, observed) {
        if let Some(mut hook) = instruction.after.take() {
            let response = Response { body };
            hook(&mut instruction, easy, &response, ctx);
            instruction.after = Some(hook);
            // Response bytes are freed here, as soon as the hook returns.
        }
    }

    debug!(
        worker = ctx.worker_index(),
        host = instruction.host,
        observed,
        transport_ok,
        "transfer complete"
    );

    // The descriptor is consumed with its transfer.
    drop(instruction);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_accepts_any_code_when_zero() {
        assert!(response_matches(0, 200));
        assert!(response_matches(0, 404));
        assert!(response_matches(0, 0));
    }

    #[test]
    fn filter_requires_exact_match_otherwise() {
        assert!(response_matches(200, 200));
        assert!(!response_matches(200, 404));
        assert!(!response_matches(404, 200));
        assert!(response_matches(404, 404));
    }

    #[test]
    fn empty_batch_is_a_noop() {
        let mut ctx = WorkerContext::new(0, None);
        assert!(run_batch(Vec::new(), &mut ctx).is_ok());
    }
}
