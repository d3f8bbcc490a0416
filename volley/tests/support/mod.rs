//! Tiny HTTP reflector used by the engine integration tests.
#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// How the reflector answers.
pub enum Mode {
    /// Answer every request with `status`, echoing method and path.
    Echo {
        /// HTTP status code to return.
        status: u16,
    },
    /// Accept and read requests but never answer (for timeout tests).
    Silent,
}

/// A running reflector bound to a loopback port.
pub struct Reflector {
    /// Port the listener bound to.
    pub port: u16,
    /// `(method, path)` of every request seen, in arrival order.
    pub requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl Reflector {
    /// Snapshot of the requests seen so far.
    pub fn seen(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a reflector on an ephemeral loopback port.
///
/// The accept loop runs on a detached thread for the life of the test
/// process; each connection is handled on its own thread so concurrent
/// workers are served concurrently.
pub fn spawn(mode: Mode) -> Reflector {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind reflector");
    let port = listener.local_addr().expect("local addr").port();

    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    let status = match mode {
        Mode::Echo { status } => Some(status),
        Mode::Silent => None,
    };

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            let seen = Arc::clone(&seen);
            thread::spawn(move || handle(stream, status, seen));
        }
    });

    Reflector { port, requests }
}

fn handle(stream: TcpStream, status: Option<u16>, seen: Arc<Mutex<Vec<(String, String)>>>) {
    let Ok(clone) = stream.try_clone() else { return };
    let mut reader = BufReader::new(clone);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) => break,
            Ok(_) => {
                let header = header.trim_end();
                if header.is_empty() {
                    break;
                }
                if let Some(value) = header.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
            Err(_) => return,
        }
    }

    if content_length > 0 {
        let mut body = vec![0u8; content_length];
        let _ = reader.read_exact(&mut body);
    }

    seen.lock().unwrap().push((method.clone(), path.clone()));

    let Some(status) = status else {
        // Silent mode: hold the connection open until the test process dies.
        thread::sleep(Duration::from_secs(600));
        return;
    };

    let body = if method == "HEAD" {
        String::new()
    } else {
        format!("{method} {path}")
    };

    let mut stream = stream;
    let _ = write!(
        stream,
        "HTTP/1.1 {status} Status\r\nX-Echo-Method: {method}\r\nX-Echo-Path: {path}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.flush();
}
