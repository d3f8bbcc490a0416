//! Request descriptors and their hooks.
//!
//! An [`Instruction`] is the unit of work: one HTTP request's full
//! specification, plus the hooks the dispatching worker invokes around it.
//! Construction performs no I/O; all client-handle setup happens inside the
//! worker engine at dispatch time.

use crate::context::WorkerContext;
use crate::transfer::ResponseSink;
use curl::easy::Easy2;
use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

/// The user agent applied when a descriptor does not override it.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.3; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/40.0.2049.0 Safari/537.36";

/// HTTP method of a descriptor.
///
/// `GET`, `POST` and `HEAD` get their method-specific client options at
/// dispatch; everything else is sent as a custom request verb only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Method {
    /// GET (the default)
    #[default]
    Get,
    /// POST with the descriptor's body
    Post,
    /// HEAD (no response body)
    Head,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// OPTIONS
    Options,
    /// Any other verb, sent as-is
    Custom(String),
}

impl Method {
    /// The wire representation of the verb.
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Custom(verb) => verb,
        }
    }
}

/// Accumulated response body handed to the `after` hook.
///
/// Freed as soon as the hook returns; copy out what you need.
pub struct Response {
    /// Raw response bytes. Includes the headers when the descriptor set
    /// `include_headers`.
    pub body: Vec<u8>,
}

impl Response {
    /// Response length in bytes.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Whether any bytes arrived at all.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// The body as text (lossy UTF-8).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Hook invoked on the worker immediately before a descriptor is dispatched.
/// May set final options on the live client handle.
pub type BeforeHook = Box<dyn FnMut(&mut Instruction, &mut Easy2<ResponseSink>, &mut WorkerContext)>;

/// Hook invoked on the worker after a transfer completes, when the transport
/// succeeded and the response code passed the descriptor's filter.
pub type AfterHook =
    Box<dyn FnMut(&mut Instruction, &mut Easy2<ResponseSink>, &Response, &mut WorkerContext)>;

/// One HTTP request to be made by the engine.
pub struct Instruction {
    /// Target host (never empty).
    pub host: String,
    /// Request path; normalized to begin with exactly one `/` at dispatch.
    pub path: String,
    /// Target port.
    pub port: u16,
    /// Use the `https` scheme.
    pub ssl: bool,
    /// HTTP method.
    pub method: Method,
    /// Request body, sent for POST.
    pub post_body: Vec<u8>,
    /// Extra `Name: Value` header lines, in insertion order.
    pub http_headers: Vec<String>,
    /// User agent for this request.
    pub user_agent: String,
    /// Cookie jar file handed to the client, if any.
    pub cookie_file: Option<PathBuf>,
    /// Proxy host, used when `use_proxy` is set.
    pub proxy: String,
    /// Proxy port.
    pub proxy_port: u16,
    /// Route the request through `proxy`.
    pub use_proxy: bool,
    /// Follow HTTP redirects.
    pub follow_redirects: bool,
    /// Prepend the response headers to the response body.
    pub include_headers: bool,
    /// Ask the client library for verbose transfer logging.
    pub verbose: bool,
    /// Response code the `after` hook is gated on; `0` accepts any.
    pub expected_response_code: u32,
    /// Reserved: per-request connect timeout (not applied by the core).
    pub connect_timeout: Option<Duration>,
    /// Reserved: per-request transfer timeout (not applied by the core).
    pub http_timeout: Option<Duration>,
    /// Transport-level outcome, recorded when the transfer completes.
    pub transport_result: Option<Result<(), curl::Error>>,
    /// Pre-dispatch hook.
    pub before: Option<BeforeHook>,
    /// Post-completion hook.
    pub after: Option<AfterHook>,
}

impl Instruction {
    /// Create a descriptor for `host` and `path` with the default attributes:
    /// GET over plain HTTP on port 80, redirects followed, headers included
    /// in the body, expected response code 200.
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            port: 80,
            ssl: false,
            method: Method::Get,
            post_body: Vec::new(),
            http_headers: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookie_file: None,
            proxy: String::new(),
            proxy_port: 8080,
            use_proxy: false,
            follow_redirects: true,
            include_headers: true,
            verbose: false,
            expected_response_code: 200,
            connect_timeout: None,
            http_timeout: None,
            transport_result: None,
            before: None,
            after: None,
        }
    }

    /// Append an HTTP header line. Order is preserved; duplicates are allowed.
    ///
    /// The header list is applied to the client handle at dispatch time.
    pub fn add_http_header(&mut self, line: impl Into<String>) {
        self.http_headers.push(line.into());
    }

    /// Replace the user agent on this descriptor.
    pub fn set_user_agent(&mut self, ua: impl Into<String>) {
        self.user_agent = ua.into();
    }

    /// Install the pre-dispatch hook.
    pub fn set_before(
        &mut self,
        hook: impl FnMut(&mut Instruction, &mut Easy2<ResponseSink>, &mut WorkerContext) + 'static,
    ) {
        self.before = Some(Box::new(hook));
    }

    /// Install the post-completion hook.
    pub fn set_after(
        &mut self,
        hook: impl FnMut(&mut Instruction, &mut Easy2<ResponseSink>, &Response, &mut WorkerContext)
        + 'static,
    ) {
        self.after = Some(Box::new(hook));
    }

    /// Rewrite `path` so it begins with exactly one `/`.
    pub(crate) fn normalize(&mut self) {
        self.path = normalize_path(&self.path);
    }
}

/// Normalize a request path: strip every leading `/`, then prepend one.
pub(crate) fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}
