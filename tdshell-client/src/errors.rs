//! Error types for tdshell-client.
//!
//! Every caller-facing operation returns one of these synchronously on the
//! calling thread. The receive loop itself never fails: bad pushes and
//! unknown correlation ids are logged and dropped.

use std::{io, time::Duration};

use tdshell_types::types::{self, ChatId, MessageId};

// ─── RpcError ─────────────────────────────────────────────────────────────────

/// A failure the backend reported for one specific request.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("backend error {code}: {message}")]
pub struct RpcError {
    /// HTTP-like status code.
    pub code:    i32,
    /// Backend diagnostic, e.g. `PHONE_CODE_INVALID`.
    pub message: String,
}

impl From<types::Error> for RpcError {
    fn from(e: types::Error) -> Self {
        Self { code: e.code, message: e.message }
    }
}

impl RpcError {
    /// Match on the diagnostic, with an optional wildcard prefix/suffix `'*'`.
    ///
    /// - `err.is("PHONE_CODE_INVALID")` exact match
    /// - `err.is("PHONE_CODE_*")` starts-with match
    /// - `err.is("*_INVALID")` ends-with match
    pub fn is(&self, pattern: &str) -> bool {
        if let Some(prefix) = pattern.strip_suffix('*') {
            self.message.starts_with(prefix)
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            self.message.ends_with(suffix)
        } else {
            self.message == pattern
        }
    }
}

// ─── InvocationError ──────────────────────────────────────────────────────────

/// The error type returned from any [`crate::Channel`] method that talks to
/// the backend.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    /// The backend rejected the request.
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// The transport refused the request.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
    /// The backend answered with an object of another kind.
    #[error("unexpected response: expected {expected}, got {got}")]
    UnexpectedResponse { expected: &'static str, got: &'static str },
    /// The receive loop stopped before the request was answered.
    #[error("request dropped")]
    Dropped,
    /// [`crate::Channel::invoke_timeout`] gave up waiting.
    #[error("no response within {0:?}")]
    Timeout(Duration),
    /// No known chat has this title.
    #[error("Not found chat {0}. Please use command 'chats' to update chat list.")]
    ChatNotFound(String),
    /// The file attached to a message cannot be downloaded.
    #[error("cannot download file `{0}`")]
    NotDownloadable(String),
}

impl InvocationError {
    /// Returns `true` if this is the named backend error (supports `'*'` wildcards).
    pub fn is(&self, pattern: &str) -> bool {
        match self {
            Self::Rpc(e) => e.is(pattern),
            _            => false,
        }
    }
}

// ─── AuthError ────────────────────────────────────────────────────────────────

/// Errors returned by [`crate::Channel::wait_for_login`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Authorization can not make progress with the configured inputs, e.g.
    /// the database encryption key was rejected too many times.
    #[error("fatal configuration error: {0}")]
    ConfigurationFatal(String),
    /// The backend closed before authorization completed.
    #[error("backend closed before authorization completed")]
    Closed,
    /// The receive loop was stopped while waiting.
    #[error("channel stopped while waiting for login")]
    Stopped,
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

// ─── RangeError ───────────────────────────────────────────────────────────────

/// Errors returned by [`crate::RangeResolver::resolve`].
#[derive(Debug, thiserror::Error)]
pub enum RangeError {
    /// The endpoints belong to different chats.
    #[error("cross-conversation range: chat {from} vs chat {to}")]
    CrossConversation { from: ChatId, to: ChatId },
    /// Walking back from the later endpoint never reached the earlier one.
    #[error("no history path from message {from} to message {to} (visited {visited})")]
    NotFound { from: MessageId, to: MessageId, visited: usize },
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}
