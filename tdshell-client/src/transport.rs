//! The duplex channel to the backend.
//!
//! The backend is reached through a [`Transport`]: requests go out tagged with
//! a correlation id, and [`Response`]s come back tagged with the same id, or
//! with id `0` when they are unsolicited pushes.
//!
//! [`MemoryTransport`] is an in-process implementation whose other end, a
//! [`BackendHandle`], can be driven by hand. It is what the test-suite runs
//! on and is useful for embedding a scripted backend.

use std::io;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tdshell_types::enums::Update;
use tdshell_types::{types, Function, Object};

/// Correlation id reserved for unsolicited pushes.
pub const PUSH_ID: u64 = 0;

// ─── Trait ────────────────────────────────────────────────────────────────────

/// One event received from the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// Id of the request this answers, or [`PUSH_ID`] for a push.
    pub request_id: u64,
    pub object:     Object,
}

/// A duplex, already-typed channel to the backend.
///
/// `send` may be called concurrently from any thread. `receive` is only ever
/// called by one thread at a time.
pub trait Transport: Send + Sync {
    /// Transmit `function` tagged with `request_id`.
    fn send(&self, request_id: u64, function: Function) -> io::Result<()>;

    /// Wait at most `timeout` for the next event.
    fn receive(&self, timeout: Duration) -> Option<Response>;
}

// ─── MemoryTransport ──────────────────────────────────────────────────────────

/// In-process transport. Create with [`MemoryTransport::pair`].
pub struct MemoryTransport {
    outgoing: Sender<(u64, Function)>,
    incoming: Receiver<Response>,
}

/// The backend side of a [`MemoryTransport`].
#[derive(Clone)]
pub struct BackendHandle {
    requests:  Receiver<(u64, Function)>,
    responses: Sender<Response>,
}

impl MemoryTransport {
    /// A connected transport and the handle that plays the backend.
    pub fn pair() -> (Self, BackendHandle) {
        let (req_tx, req_rx) = channel::unbounded();
        let (resp_tx, resp_rx) = channel::unbounded();
        (
            Self { outgoing: req_tx, incoming: resp_rx },
            BackendHandle { requests: req_rx, responses: resp_tx },
        )
    }
}

impl Transport for MemoryTransport {
    fn send(&self, request_id: u64, function: Function) -> io::Result<()> {
        self.outgoing
            .send((request_id, function))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "backend handle dropped"))
    }

    fn receive(&self, timeout: Duration) -> Option<Response> {
        match self.incoming.recv_timeout(timeout) {
            Ok(r) => Some(r),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                // Keep the caller's poll cadence instead of spinning.
                std::thread::sleep(timeout);
                None
            }
        }
    }
}

impl BackendHandle {
    /// The next request the client sent, waiting at most `timeout`.
    pub fn next_request(&self, timeout: Duration) -> Option<(u64, Function)> {
        self.requests.recv_timeout(timeout).ok()
    }

    /// Every request sent so far and not yet taken.
    pub fn drain_requests(&self) -> Vec<(u64, Function)> {
        self.requests.try_iter().collect()
    }

    /// Answer request `request_id` with `object`.
    pub fn reply(&self, request_id: u64, object: impl Into<Object>) {
        let _ = self.responses.send(Response { request_id, object: object.into() });
    }

    /// Fail request `request_id` with a backend error.
    pub fn reply_error(&self, request_id: u64, code: i32, message: &str) {
        self.reply(request_id, Object::Error(types::Error { code, message: message.into() }));
    }

    /// Emit an unsolicited push.
    pub fn push(&self, update: Update) {
        self.reply(PUSH_ID, Object::Update(update));
    }

    /// Emit an arbitrary object under the push id, well-formed or not.
    pub fn push_raw(&self, object: Object) {
        self.reply(PUSH_ID, object);
    }
}
