//! Per-transfer plumbing: the response sink and client option application.

use crate::instruction::{Instruction, Method};
use curl::easy::{Easy2, Handler, List, WriteError};
use std::time::Duration;

/// Handler attached to every easy handle.
///
/// Accumulates response bytes and carries the in-flight [`Instruction`]
/// through the transfer, so completion handling can recover the descriptor
/// from the handle alone.
pub struct ResponseSink {
    instruction: Option<Instruction>,
    body: Vec<u8>,
}

impl ResponseSink {
    pub(crate) fn new() -> Self {
        Self {
            instruction: None,
            body: Vec::new(),
        }
    }

    /// Park the descriptor in the sink for the duration of the transfer.
    pub(crate) fn load(&mut self, instruction: Instruction) {
        self.instruction = Some(instruction);
        self.body.clear();
    }

    /// Recover the descriptor and the accumulated body after completion.
    pub(crate) fn unload(&mut self) -> (Option<Instruction>, Vec<u8>) {
        (self.instruction.take(), std::mem::take(&mut self.body))
    }
}

impl Handler for ResponseSink {
    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        // A short write tells libcurl to abort this transfer with a
        // transport error; no partially-truncated body is surfaced.
        if self.body.try_reserve(data.len()).is_err() {
            return Ok(0);
        }

        self.body.extend_from_slice(data);
        Ok(data.len())
    }
}

/// Compose the request URL from scheme, host and (normalized) path.
///
/// The port is not part of the URL; it is set as an explicit client option.
pub(crate) fn compose_url(instruction: &Instruction) -> String {
    let scheme = if instruction.ssl { "https" } else { "http" };
    format!("{scheme}://{}{}", instruction.host, instruction.path)
}

/// Apply a descriptor's options to an easy handle.
///
/// Custom verb always, method-specific flags for GET/POST/HEAD, no signal
/// handlers ever, peer verification off, a short DNS cache so long runs
/// re-resolve.
pub(crate) fn apply_options(
    easy: &mut Easy2<ResponseSink>,
    instruction: &Instruction,
    url: &str,
) -> Result<(), curl::Error> {
    easy.custom_request(instruction.method.as_str())?;

    match instruction.method {
        Method::Get => easy.get(true)?,
        Method::Post => {
            easy.post(true)?;
            easy.post_fields_copy(&instruction.post_body)?;
        }
        Method::Head => easy.nobody(true)?,
        _ => {}
    }

    if instruction.follow_redirects {
        easy.follow_location(true)?;
    }

    if let Some(cookie_file) = &instruction.cookie_file {
        easy.cookie_file(cookie_file)?;
    }

    if instruction.verbose {
        easy.verbose(true)?;
    }

    if instruction.use_proxy && !instruction.proxy.is_empty() {
        easy.proxy(&instruction.proxy)?;
        easy.proxy_port(instruction.proxy_port)?;
    }

    easy.signal(false)?; // do not remove
    easy.dns_cache_timeout(Duration::from_secs(1))?;

    if instruction.include_headers {
        easy.show_header(true)?;
    }

    easy.useragent(&instruction.user_agent)?;
    easy.url(url)?;
    easy.port(instruction.port)?;
    easy.ssl_verify_peer(false)?;

    if !instruction.http_headers.is_empty() {
        let mut list = List::new();
        for line in &instruction.http_headers {
            list.append(line)?;
        }
        easy.http_headers(list)?;
    }

    Ok(())
}
