//! Per-file download progress callbacks.
//!
//! The backend reports download progress through file-state pushes. A
//! callback registered for a file id is run for each of them, in the order
//! they arrive, and is dropped automatically after the push that reports the
//! transfer complete.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, TryRecvError};
use parking_lot::Mutex;
use tdshell_types::types::{File, FileId};

use crate::errors::InvocationError;

// ─── DownloadProgress ─────────────────────────────────────────────────────────

/// Snapshot of one file's transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadProgress {
    pub file_id:    FileId,
    /// Total size in bytes, `0` while unknown.
    pub total:      i64,
    pub downloaded: i64,
    pub completed:  bool,
    /// Local path, meaningful once `completed`.
    pub path:       String,
}

impl From<&File> for DownloadProgress {
    fn from(file: &File) -> Self {
        Self {
            file_id:    file.id,
            total:      file.total_size(),
            downloaded: file.local.downloaded_size,
            completed:  file.local.is_downloading_completed,
            path:       file.local.path.clone(),
        }
    }
}

impl DownloadProgress {
    /// Completion in `0.0..=1.0`, or `None` while the size is unknown.
    pub fn fraction(&self) -> Option<f64> {
        (self.total > 0).then(|| (self.downloaded as f64 / self.total as f64).clamp(0.0, 1.0))
    }
}

// ─── DownloadRegistry ─────────────────────────────────────────────────────────

type Cell = Mutex<Box<dyn FnMut(&DownloadProgress) + Send>>;
type Callback = Arc<Cell>;

/// Identifies one registration, so it can be removed without touching a
/// newer callback installed for the same file id.
pub(crate) type Entry = Weak<Cell>;

fn same_entry(callback: &Callback, entry: &Entry) -> bool {
    Arc::as_ptr(callback) == entry.as_ptr()
}

/// Map from file id to its progress callback.
#[derive(Default)]
pub struct DownloadRegistry {
    callbacks: Mutex<HashMap<FileId, Callback>>,
}

impl DownloadRegistry {
    pub fn new() -> Self { Self::default() }

    /// Install `callback` for `file_id`.
    ///
    /// Returns `true` if it replaced a callback already registered for that
    /// id. The replaced callback is dropped and never runs again.
    pub fn register_progress(
        &self,
        file_id:  FileId,
        callback: impl FnMut(&DownloadProgress) + Send + 'static,
    ) -> bool {
        self.install(file_id, callback).1
    }

    pub(crate) fn install(
        &self,
        file_id:  FileId,
        callback: impl FnMut(&DownloadProgress) + Send + 'static,
    ) -> (Entry, bool) {
        let callback: Callback = Arc::new(Mutex::new(Box::new(callback)));
        let entry = Arc::downgrade(&callback);
        let replaced = self.callbacks.lock().insert(file_id, callback);
        if replaced.is_some() {
            tracing::warn!("[tdshell] Download callback for file {file_id} replaced");
        }
        (entry, replaced.is_some())
    }

    /// Remove the callback for `file_id` early.
    pub fn unregister(&self, file_id: FileId) -> bool {
        self.callbacks.lock().remove(&file_id).is_some()
    }

    /// Remove `entry` unless another callback replaced it since.
    pub(crate) fn unregister_entry(&self, file_id: FileId, entry: &Entry) -> bool {
        let mut callbacks = self.callbacks.lock();
        if callbacks.get(&file_id).is_some_and(|cb| same_entry(cb, entry)) {
            callbacks.remove(&file_id);
            true
        } else {
            false
        }
    }

    pub fn is_registered(&self, file_id: FileId) -> bool {
        self.callbacks.lock().contains_key(&file_id)
    }

    pub fn len(&self) -> usize { self.callbacks.lock().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Drop every callback and return how many there were.
    pub fn clear(&self) -> usize {
        let drained: Vec<Callback> = self.callbacks.lock().drain().map(|(_, cb)| cb).collect();
        drained.len()
    }

    /// Run the callback registered for `file.id`, if any.
    ///
    /// The callback runs outside the registry lock, so it may register or
    /// unregister. When `file` reports completion the callback is removed
    /// afterwards, unless it was replaced in the meantime.
    pub fn dispatch(&self, file: &File) -> bool {
        let Some(callback) = self.callbacks.lock().get(&file.id).cloned() else {
            tracing::trace!("[tdshell] File {} update with no download registered", file.id);
            return false;
        };

        let progress = DownloadProgress::from(file);
        tracing::debug!(
            "[tdshell] File {} {}/{}{}",
            progress.file_id, progress.downloaded, progress.total,
            if progress.completed { " ✓" } else { "" },
        );
        {
            let mut f = callback.lock();
            (*f)(&progress);
        }

        if progress.completed {
            self.unregister_entry(file.id, &Arc::downgrade(&callback));
        }
        true
    }
}

// ─── PendingDownload ──────────────────────────────────────────────────────────

/// A download in flight. Resolves with the final [`DownloadProgress`].
pub struct PendingDownload {
    file_id: FileId,
    state:   Pending,
}

enum Pending {
    Ready(DownloadProgress),
    Waiting {
        rx:       Receiver<DownloadProgress>,
        registry: Weak<DownloadRegistry>,
        entry:    Entry,
    },
}

impl PendingDownload {
    pub(crate) fn ready(progress: DownloadProgress) -> Self {
        Self { file_id: progress.file_id, state: Pending::Ready(progress) }
    }

    pub(crate) fn waiting(
        file_id:  FileId,
        rx:       Receiver<DownloadProgress>,
        registry: &Arc<DownloadRegistry>,
        entry:    Entry,
    ) -> Self {
        Self { file_id, state: Pending::Waiting { rx, registry: Arc::downgrade(registry), entry } }
    }

    pub fn file_id(&self) -> FileId { self.file_id }

    /// `true` if the file was complete when the download was requested.
    pub fn is_ready(&self) -> bool { matches!(self.state, Pending::Ready(_)) }

    /// Remove this download's progress callback, unless the file id was
    /// registered again since. Returns `true` if it was still registered.
    pub(crate) fn forget(&self) -> bool {
        match &self.state {
            Pending::Ready(_) => false,
            Pending::Waiting { registry, entry, .. } => registry
                .upgrade()
                .is_some_and(|r| r.unregister_entry(self.file_id, entry)),
        }
    }

    /// Block until the transfer completes.
    ///
    /// Fails with [`InvocationError::Dropped`] if the callback was dropped
    /// first: the channel stopped, or the file id was registered again.
    pub fn wait(self) -> Result<DownloadProgress, InvocationError> {
        match self.state {
            Pending::Ready(p)           => Ok(p),
            Pending::Waiting { rx, .. } => rx.recv().map_err(|_| InvocationError::Dropped),
        }
    }

    /// [`wait`](Self::wait), giving up after `timeout`.
    ///
    /// On expiry the progress callback is removed; later progress for the
    /// file goes nowhere.
    pub fn wait_timeout(self, timeout: Duration) -> Result<DownloadProgress, InvocationError> {
        let rx = match &self.state {
            Pending::Ready(p)           => return Ok(p.clone()),
            Pending::Waiting { rx, .. } => rx,
        };
        match rx.recv_timeout(timeout) {
            Ok(p) => Ok(p),
            Err(RecvTimeoutError::Disconnected) => Err(InvocationError::Dropped),
            Err(RecvTimeoutError::Timeout) => {
                if self.forget() {
                    tracing::debug!("[tdshell] Download of file {} timed out after {timeout:?}", self.file_id);
                    return Err(InvocationError::Timeout(timeout));
                }
                // Completed just now: the final state is already buffered.
                rx.try_recv().map_err(|e| match e {
                    TryRecvError::Empty        => InvocationError::Timeout(timeout),
                    TryRecvError::Disconnected => InvocationError::Dropped,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tdshell_types::types::LocalFile;

    fn file(id: FileId, downloaded: i64, completed: bool) -> File {
        File {
            id,
            size: 100,
            expected_size: 100,
            local: LocalFile {
                path: if completed { format!("/tmp/{id}") } else { String::new() },
                can_be_downloaded: true,
                is_downloading_active: !completed,
                is_downloading_completed: completed,
                downloaded_size: downloaded,
            },
        }
    }

    fn recorder(reg: &DownloadRegistry, id: FileId) -> Arc<Mutex<Vec<DownloadProgress>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        reg.register_progress(id, move |p| s.lock().push(p.clone()));
        seen
    }

    #[test]
    fn progress_in_order_then_auto_deregistered() {
        let reg = DownloadRegistry::new();
        let seen = recorder(&reg, 5);

        assert!(reg.dispatch(&file(5, 10, false)));
        assert!(reg.dispatch(&file(5, 60, false)));
        assert!(reg.dispatch(&file(5, 100, true)));
        assert!(!reg.is_registered(5));

        // Re-announcement after completion (e.g. the file was moved) goes nowhere.
        assert!(!reg.dispatch(&file(5, 100, true)));

        let seen = seen.lock();
        let sizes: Vec<i64> = seen.iter().map(|p| p.downloaded).collect();
        assert_eq!(sizes, [10, 60, 100]);
        assert!(seen[2].completed);
        assert_eq!(seen[2].path, "/tmp/5");
    }

    #[test]
    fn files_are_independent() {
        let reg = DownloadRegistry::new();
        let a = recorder(&reg, 1);
        let b = recorder(&reg, 2);
        reg.dispatch(&file(2, 100, true));
        reg.dispatch(&file(1, 50, false));
        assert_eq!(a.lock().len(), 1);
        assert_eq!(b.lock().len(), 1);
        assert!(reg.is_registered(1));
        assert!(!reg.is_registered(2));
    }

    #[test]
    fn unregister_stops_callbacks() {
        let reg = DownloadRegistry::new();
        let seen = recorder(&reg, 3);
        assert!(reg.unregister(3));
        assert!(!reg.dispatch(&file(3, 1, false)));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn replacement_during_completion_survives() {
        let reg = Arc::new(DownloadRegistry::new());
        let r = Arc::clone(&reg);
        reg.register_progress(9, move |_| { r.register_progress(9, |_| {}); });
        reg.dispatch(&file(9, 100, true));
        assert!(reg.is_registered(9), "the newer registration is kept");
    }

    #[test]
    fn clear_releases_waiters() {
        let reg = Arc::new(DownloadRegistry::new());
        let (tx, rx) = crossbeam::channel::bounded(1);
        let (entry, _) = reg.install(4, move |p| { let _ = tx.try_send(p.clone()); });
        let pending = PendingDownload::waiting(4, rx, &reg, entry);
        assert_eq!(reg.clear(), 1);
        assert!(matches!(pending.wait(), Err(InvocationError::Dropped)));
    }

    #[test]
    fn timed_out_wait_removes_its_callback() {
        let reg = Arc::new(DownloadRegistry::new());
        let (tx, rx) = crossbeam::channel::bounded(1);
        let calls = Arc::new(Mutex::new(0));
        let c = Arc::clone(&calls);
        let (entry, _) = reg.install(6, move |p| {
            *c.lock() += 1;
            if p.completed { let _ = tx.try_send(p.clone()); }
        });
        let pending = PendingDownload::waiting(6, rx, &reg, entry);

        let err = pending.wait_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, InvocationError::Timeout(_)));
        assert!(!reg.is_registered(6));
        assert!(!reg.dispatch(&file(6, 50, false)));
        assert_eq!(*calls.lock(), 0);
    }

    #[test]
    fn stale_entry_leaves_the_newer_callback() {
        let reg = DownloadRegistry::new();
        let (old, _) = reg.install(8, |_| {});
        let (_, replaced) = reg.install(8, |_| {});
        assert!(replaced);
        assert!(!reg.unregister_entry(8, &old));
        assert!(reg.is_registered(8));
    }

    #[test]
    fn completed_before_the_deadline_is_returned() {
        let reg = Arc::new(DownloadRegistry::new());
        let (tx, rx) = crossbeam::channel::bounded(1);
        let (entry, _) = reg.install(2, move |p| {
            if p.completed { let _ = tx.try_send(p.clone()); }
        });
        let pending = PendingDownload::waiting(2, rx, &reg, entry);
        reg.dispatch(&file(2, 100, true));
        let done = pending.wait_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(done.path, "/tmp/2");
    }

    #[test]
    fn fraction_needs_a_size() {
        let mut p = DownloadProgress::from(&file(1, 25, false));
        assert_eq!(p.fraction(), Some(0.25));
        p.total = 0;
        assert_eq!(p.fraction(), None);
    }
}
