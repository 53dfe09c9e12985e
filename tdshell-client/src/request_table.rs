//! Correlation of outstanding requests with their result handlers.
//!
//! Every request sent with a waiter gets a fresh id and a single-use handler.
//! The receive loop takes the handler out of the table when the matching
//! response arrives and runs it outside the lock, so a handler may freely
//! register new requests.

use std::collections::HashMap;

use parking_lot::Mutex;
use tdshell_types::{FromObject, Object};

use crate::errors::{InvocationError, RpcError};

/// Single-use result callback of one request.
pub type Handler = Box<dyn FnOnce(Object) + Send>;

struct Inner {
    next_id: u64,
    pending: HashMap<u64, Handler>,
}

/// Thread-safe map from request id to its pending handler.
pub struct RequestTable {
    inner: Mutex<Inner>,
}

impl Default for RequestTable {
    fn default() -> Self { Self::new() }
}

impl RequestTable {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// A table whose generator hands out `first` next (`0` is bumped to `1`).
    pub fn starting_at(first: u64) -> Self {
        Self {
            inner: Mutex::new(Inner { next_id: first.max(1), pending: HashMap::new() }),
        }
    }

    /// Store `handler` under a fresh id and return that id.
    pub fn register(&self, handler: impl FnOnce(Object) + Send + 'static) -> u64 {
        let mut inner = self.inner.lock();
        let id = next_free_id(&mut inner);
        inner.pending.insert(id, Box::new(handler));
        id
    }

    /// A fresh id for a request sent without a waiter.
    pub fn allocate_id(&self) -> u64 {
        next_free_id(&mut self.inner.lock())
    }

    /// Remove and return the handler for `id`.
    pub fn take(&self, id: u64) -> Option<Handler> {
        self.inner.lock().pending.remove(&id)
    }

    /// Forget the handler for `id` without running it.
    pub fn remove(&self, id: u64) -> bool {
        self.take(id).is_some()
    }

    /// Route `object` to the handler registered for `id`.
    ///
    /// Returns `false` when nothing is registered under `id`.
    pub fn fulfill(&self, id: u64, object: Object) -> bool {
        match self.take(id) {
            Some(handler) => { handler(object); true }
            None          => false,
        }
    }

    /// Drop every pending handler without running it and return how many
    /// there were.
    pub fn clear(&self) -> usize {
        let drained: Vec<Handler> = {
            let mut inner = self.inner.lock();
            inner.pending.drain().map(|(_, h)| h).collect()
        };
        // Dropped outside the lock: a handler's captures may do anything on drop.
        drained.len()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.inner.lock().pending.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Monotonic, wraps from `u64::MAX` to `1`, skips `0` and ids still pending.
fn next_free_id(inner: &mut Inner) -> u64 {
    loop {
        let id = inner.next_id;
        inner.next_id = if id == u64::MAX { 1 } else { id + 1 };
        if id != 0 && !inner.pending.contains_key(&id) {
            return id;
        }
    }
}

/// Turn a raw response into the typed result of a request.
pub(crate) fn extract<T: FromObject>(object: Object) -> Result<T, InvocationError> {
    match object {
        Object::Error(e) => Err(RpcError::from(e).into()),
        other => T::from_object(other).map_err(|o| InvocationError::UnexpectedResponse {
            expected: T::KIND,
            got:      o.kind(),
        }),
    }
}
