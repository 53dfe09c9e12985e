//! The [`Channel`] facade.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeZone};
use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use tdshell_types::types::{ChatId, File, FileId, Message, MessageId, User, UserId};
use tdshell_types::{functions, Function, Object, RemoteCall};

use crate::auth::{AuthAction, AuthorizationDriver};
use crate::directory::ChatDirectory;
use crate::downloads::{DownloadProgress, DownloadRegistry, PendingDownload};
use crate::errors::{AuthError, InvocationError, RangeError};
use crate::range::{HistorySource, RangeResolver};
use crate::request_table::{extract, RequestTable};
use crate::transport::{Response, Transport};
use crate::update::{self, Push, Routed};
use crate::Config;

/// Format accepted by [`parse_history_date`]: `2024-03-01T18:30:00`.
pub const HISTORY_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Page size of [`Channel::history`] when asked for `0` messages.
const DEFAULT_HISTORY_LIMIT: i32 = 50;

/// Highest download priority the backend accepts.
const DOWNLOAD_PRIORITY: i32 = 32;

/// Parse a local date-time in [`HISTORY_DATE_FORMAT`].
pub fn parse_history_date(s: &str) -> chrono::ParseResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), HISTORY_DATE_FORMAT)
}

fn local_timestamp(at: NaiveDateTime) -> i32 {
    let secs = Local
        .from_local_datetime(&at)
        .earliest()
        .map(|t| t.timestamp())
        .unwrap_or_else(|| at.and_utc().timestamp());
    i32::try_from(secs).unwrap_or(if secs < 0 { i32::MIN } else { i32::MAX })
}

// ─── Shared ───────────────────────────────────────────────────────────────────

/// State shared between callers and the receive thread.
struct Shared {
    transport:           Arc<dyn Transport>,
    requests:            RequestTable,
    downloads:           Arc<DownloadRegistry>,
    directory:           ChatDirectory,
    auth:                Mutex<AuthorizationDriver>,
    /// Mirrors the driver's epoch; readable while a prompt holds `auth`.
    auth_epoch:          Arc<AtomicU64>,
    /// Held while receiving and dispatching, so exactly one thread drains.
    receive:             Mutex<()>,
    authorized:          AtomicBool,
    need_restart:        AtomicBool,
    fatal:               Mutex<Option<String>>,
    running:             AtomicBool,
    stopped:             AtomicBool,
    poll_timeout:        Duration,
    login_poll_interval: Duration,
    max_range_messages:  usize,
}

impl Shared {
    fn poll_once(self: &Arc<Self>, timeout: Duration) -> bool {
        let _guard = self.receive.lock();
        match self.transport.receive(timeout) {
            Some(response) => { self.dispatch(response); true }
            None           => false,
        }
    }

    fn dispatch(self: &Arc<Self>, response: Response) {
        match update::route(response) {
            Routed::Response { id, object } => {
                if self.requests.fulfill(id, object) {
                    tracing::debug!("[tdshell] ← #{id}");
                } else {
                    tracing::debug!("[tdshell] No pending request #{id}, answer dropped");
                }
            }
            Routed::Push(push)        => self.on_push(push),
            Routed::Malformed(object) => {
                tracing::warn!("[tdshell] Dropping malformed push of kind {}", object.kind());
            }
        }
    }

    fn on_push(self: &Arc<Self>, push: Push) {
        match push {
            Push::Authorization(state) => {
                tracing::debug!("[tdshell] Authorization state {state:?}");
                let action = self.auth.lock().on_state(state);
                self.apply(action);
            }
            Push::ChatTitle { chat_id, title } => self.directory.insert_chat(chat_id, title),
            Push::User(user)                   => self.directory.insert_user(user),
            Push::File(file)                   => { self.downloads.dispatch(&file); }
            Push::Other(update)                => tracing::trace!("[tdshell] Unhandled push {update:?}"),
        }
    }

    fn apply(self: &Arc<Self>, action: AuthAction) {
        match action {
            AuthAction::Submit { function, epoch } => self.submit_auth_step(function, epoch),
            AuthAction::Authorized => {
                self.authorized.store(true, Ordering::SeqCst);
                tracing::info!("[tdshell] Authorized ✓");
            }
            AuthAction::LoggedOut => {
                self.authorized.store(false, Ordering::SeqCst);
                tracing::info!("[tdshell] Logging out");
            }
            AuthAction::Closed => {
                self.authorized.store(false, Ordering::SeqCst);
                self.need_restart.store(true, Ordering::SeqCst);
                tracing::info!("[tdshell] Backend closed, restart required");
            }
            AuthAction::Fatal(reason) => {
                tracing::error!("[tdshell] Authorization failed: {reason}");
                *self.fatal.lock() = Some(reason);
            }
            AuthAction::Wait => {}
        }
    }

    fn submit_auth_step(self: &Arc<Self>, function: Function, epoch: u64) {
        let name = function.name();
        let weak: Weak<Self> = Arc::downgrade(self);
        let id = self.requests.register(move |object| {
            if let Some(shared) = weak.upgrade() {
                let next = shared.auth.lock().on_submission_result(epoch, &object);
                shared.apply(next);
            }
        });
        tracing::debug!("[tdshell] → {name} #{id} (epoch {epoch})");
        if let Err(e) = self.transport.send(id, function) {
            self.requests.remove(id);
            self.apply(AuthAction::Fatal(format!("could not send {name}: {e}")));
        }
    }
}

// ─── Channel ──────────────────────────────────────────────────────────────────

/// Blocking client over a [`Transport`].
///
/// Call [`start`](Self::start) to spawn the receive thread, then use the
/// blocking methods from any thread. Credential prompts and progress pushes
/// are handled on the receive thread, so those callbacks must not call back
/// into blocking methods of the same channel. A download that is already
/// complete when requested reports to its callback on the calling thread.
///
/// Dropping the channel stops and joins the receive thread.
pub struct Channel {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Channel {
    /// Wrap `transport` and send the start-up requests (log verbosity and
    /// version query). The receive thread is not started yet.
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Result<Self, InvocationError> {
        let driver = AuthorizationDriver::new(&config);
        let shared = Arc::new(Shared {
            transport,
            requests:            RequestTable::new(),
            downloads:           Arc::new(DownloadRegistry::new()),
            directory:           ChatDirectory::new(),
            auth_epoch:          driver.epoch_counter(),
            auth:                Mutex::new(driver),
            receive:             Mutex::new(()),
            authorized:          AtomicBool::new(false),
            need_restart:        AtomicBool::new(false),
            fatal:               Mutex::new(None),
            running:             AtomicBool::new(false),
            stopped:             AtomicBool::new(false),
            poll_timeout:        config.poll_timeout,
            login_poll_interval: config.login_poll_interval,
            max_range_messages:  config.max_range_messages,
        });
        let channel = Self { shared, worker: Mutex::new(None) };
        channel.send(functions::SetLogVerbosityLevel { new_verbosity_level: config.log_verbosity })?;
        channel.send(functions::GetOption { name: "version".into() })?;
        Ok(channel)
    }

    // ── Receive loop ─────────────────────────────────────────────────────────

    /// Spawn the receive thread. Does nothing if it is already running.
    pub fn start(&self) -> io::Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }
        self.shared.stopped.store(false, Ordering::SeqCst);
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("tdshell-receive".into())
            .spawn(move || {
                tracing::info!("[tdshell] Receive loop started ✓");
                while shared.running.load(Ordering::SeqCst) {
                    shared.poll_once(shared.poll_timeout);
                }
            });
        match spawned {
            Ok(handle) => { *worker = Some(handle); Ok(()) }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Stop and join the receive thread.
    ///
    /// Every pending request fails with [`InvocationError::Dropped`] and every
    /// download callback is dropped, so no caller stays blocked.
    pub fn stop(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shared.running.store(false, Ordering::SeqCst);

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                tracing::warn!("[tdshell] stop() called on the receive thread, not joining");
            } else if handle.join().is_err() {
                tracing::error!("[tdshell] Receive thread panicked");
            }
        }

        let requests = self.shared.requests.clear();
        let downloads = self.shared.downloads.clear();
        tracing::info!("[tdshell] Receive loop stopped ✓ ({requests} requests, {downloads} downloads released)");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Receive and dispatch at most one event on the calling thread.
    ///
    /// For driving the channel by hand instead of [`start`](Self::start).
    /// Returns `false` if nothing arrived within `timeout`.
    pub fn pump(&self, timeout: Duration) -> bool {
        self.shared.poll_once(timeout)
    }

    // ── Requests ─────────────────────────────────────────────────────────────

    /// Send `request` without waiting for an answer. Returns its id.
    pub fn send<R: RemoteCall>(&self, request: R) -> Result<u64, InvocationError> {
        let function: Function = request.into();
        let id = self.shared.requests.allocate_id();
        tracing::debug!("[tdshell] → {} #{id} (no reply expected)", function.name());
        self.shared.transport.send(id, function)?;
        Ok(id)
    }

    /// Send `request` and block until the backend answers it.
    pub fn invoke<R: RemoteCall>(&self, request: R) -> Result<R::Return, InvocationError> {
        let (_, rx) = self.submit(request.into())?;
        let object = rx.recv().map_err(|_| InvocationError::Dropped)?;
        extract(object)
    }

    /// [`invoke`](Self::invoke), giving up after `timeout`.
    ///
    /// On expiry the request is forgotten; an answer arriving later is dropped.
    pub fn invoke_timeout<R: RemoteCall>(
        &self,
        request: R,
        timeout: Duration,
    ) -> Result<R::Return, InvocationError> {
        let (id, rx) = self.submit(request.into())?;
        match rx.recv_timeout(timeout) {
            Ok(object) => extract(object),
            Err(RecvTimeoutError::Disconnected) => Err(InvocationError::Dropped),
            Err(RecvTimeoutError::Timeout) => {
                if self.shared.requests.remove(id) {
                    tracing::debug!("[tdshell] #{id} timed out after {timeout:?}");
                    Err(InvocationError::Timeout(timeout))
                } else {
                    // The receive thread took the slot just now; its answer is on the way.
                    let object = rx.recv().map_err(|_| InvocationError::Dropped)?;
                    extract(object)
                }
            }
        }
    }

    fn submit(&self, function: Function) -> Result<(u64, Receiver<Object>), InvocationError> {
        let (tx, rx) = channel::bounded(1);
        let name = function.name();
        let id = self.shared.requests.register(move |object| {
            let _ = tx.send(object);
        });
        if self.shared.stopped.load(Ordering::SeqCst) {
            self.shared.requests.remove(id);
            return Err(InvocationError::Dropped);
        }
        tracing::debug!("[tdshell] → {name} #{id}");
        if let Err(e) = self.shared.transport.send(id, function) {
            self.shared.requests.remove(id);
            return Err(e.into());
        }
        Ok((id, rx))
    }

    /// Number of requests waiting for an answer.
    pub fn pending_requests(&self) -> usize {
        self.shared.requests.len()
    }

    // ── Authorization ────────────────────────────────────────────────────────

    /// Block until the backend reports authorization complete.
    ///
    /// Pumps the receive path itself when the receive thread is not running,
    /// otherwise polls the authorization flag.
    pub fn wait_for_login(&self) -> Result<(), AuthError> {
        loop {
            if let Some(reason) = self.shared.fatal.lock().clone() {
                return Err(AuthError::ConfigurationFatal(reason));
            }
            if self.is_authorized() {
                return Ok(());
            }
            if self.needs_restart() {
                return Err(AuthError::Closed);
            }
            if self.is_running() {
                thread::sleep(self.shared.login_poll_interval);
            } else if self.shared.stopped.load(Ordering::SeqCst) {
                return Err(AuthError::Stopped);
            } else {
                self.shared.poll_once(self.shared.poll_timeout);
            }
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.shared.authorized.load(Ordering::SeqCst)
    }

    /// `true` once the backend reported itself closed. A new backend
    /// instance and a new channel are needed to continue.
    pub fn needs_restart(&self) -> bool {
        self.shared.need_restart.load(Ordering::SeqCst)
    }

    /// Current authorization epoch.
    pub fn auth_epoch(&self) -> u64 {
        self.shared.auth_epoch.load(Ordering::SeqCst)
    }

    /// Log out of the account.
    pub fn log_out(&self) -> Result<(), InvocationError> {
        self.invoke(functions::LogOut).map(drop)
    }

    /// Close the backend instance.
    pub fn close(&self) -> Result<(), InvocationError> {
        self.invoke(functions::Close).map(drop)
    }

    // ── Chats & users ────────────────────────────────────────────────────────

    /// Cached chat and user names.
    pub fn directory(&self) -> &ChatDirectory {
        &self.shared.directory
    }

    /// Title of a known chat, or `"unknown chat"`.
    pub fn chat_title(&self, chat_id: ChatId) -> String {
        self.shared.directory.chat_title(chat_id).unwrap_or_else(|| "unknown chat".into())
    }

    /// Full name of a known user, or `"unknown user"`.
    pub fn user_name(&self, user_id: UserId) -> String {
        self.shared
            .directory
            .user(user_id)
            .map(|u| u.full_name())
            .unwrap_or_else(|| "unknown user".into())
    }

    /// Fetch a user from the backend and cache it.
    pub fn user(&self, user_id: UserId) -> Result<User, InvocationError> {
        let user = self.invoke(functions::GetUser { user_id })?;
        self.shared.directory.insert_user(user.clone());
        Ok(user)
    }

    /// Id of the first known chat titled `title`.
    pub fn find_chat_id(&self, title: &str) -> Option<ChatId> {
        self.shared.directory.find_chat(title)
    }

    /// A chat given either by numeric id or by title.
    pub fn resolve_chat(&self, chat: &str) -> Result<ChatId, InvocationError> {
        if let Ok(id) = chat.trim().parse::<ChatId>() {
            return Ok(id);
        }
        self.find_chat_id(chat).ok_or_else(|| InvocationError::ChatNotFound(chat.to_string()))
    }

    /// Fetch up to `limit` chats of the main list, caching their titles.
    pub fn chats(&self, limit: i32) -> Result<Vec<(ChatId, String)>, InvocationError> {
        let list = self.invoke(functions::GetChats { limit })?;
        let mut chats = Vec::with_capacity(list.chat_ids.len());
        for chat_id in list.chat_ids {
            let chat = self.invoke(functions::GetChat { chat_id })?;
            self.shared.directory.insert_chat(chat.id, chat.title.clone());
            chats.push((chat.id, chat.title));
        }
        Ok(chats)
    }

    // ── Messages ─────────────────────────────────────────────────────────────

    fn fetch_history(
        &self,
        chat_id: ChatId,
        from_message_id: MessageId,
        offset: i32,
        limit: i32,
    ) -> Result<Vec<Message>, InvocationError> {
        let limit = if limit == 0 { DEFAULT_HISTORY_LIMIT } else { limit };
        let page = self.invoke(functions::GetChatHistory {
            chat_id,
            from_message_id,
            offset,
            limit,
            only_local: false,
        })?;
        Ok(page.messages)
    }

    /// The newest `limit` messages of a chat (50 when `0`), newest first.
    pub fn history(&self, chat_id: ChatId, limit: i32) -> Result<Vec<Message>, InvocationError> {
        let chat = self.invoke(functions::GetChat { chat_id })?;
        match chat.last_message {
            Some(last) => self.fetch_history(chat_id, last.id, 0, limit),
            None       => Ok(Vec::new()),
        }
    }

    /// Messages around the first one sent at or after local time `since`,
    /// newest first.
    pub fn history_since(
        &self,
        chat_id: ChatId,
        since: NaiveDateTime,
        limit: i32,
    ) -> Result<Vec<Message>, InvocationError> {
        let anchor = self.invoke(functions::GetChatMessageByDate { chat_id, date: local_timestamp(since) })?;
        self.fetch_history(chat_id, anchor.id, -1, limit)
    }

    /// The message a `t.me` link points to.
    pub fn message_by_link(&self, url: &str) -> Result<Message, InvocationError> {
        let info = self.invoke(functions::GetMessageLinkInfo { url: url.to_string() })?;
        info.message.ok_or(InvocationError::UnexpectedResponse {
            expected: "message",
            got:      "messageLinkInfo",
        })
    }

    /// Fetch messages of one chat one by one, in the given order.
    pub fn messages(&self, chat_id: ChatId, ids: &[MessageId]) -> Result<Vec<Message>, InvocationError> {
        ids.iter()
            .map(|&message_id| self.invoke(functions::GetMessage { chat_id, message_id }))
            .collect()
    }

    /// Mark a message's content as opened.
    pub fn open_message_content(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), InvocationError> {
        self.invoke(functions::OpenMessageContent { chat_id, message_id }).map(drop)
    }

    /// Read `count` bytes (`0`: to the end) of a downloaded file.
    pub fn read_file_part(&self, file_id: FileId, offset: i64, count: i64) -> Result<Vec<u8>, InvocationError> {
        Ok(self.invoke(functions::ReadFilePart { file_id, offset, count })?.data)
    }

    /// Every message from `from` to `to`, both included, newest first.
    pub fn resolve_range(
        &self,
        chat_id: ChatId,
        from: &Message,
        to: &Message,
    ) -> Result<Vec<Message>, RangeError> {
        RangeResolver::new(self, self.shared.max_range_messages).resolve(chat_id, from, to)
    }

    // ── Downloads ────────────────────────────────────────────────────────────

    /// Run `callback` on every progress push for `file_id` until it completes.
    pub fn register_progress(
        &self,
        file_id: FileId,
        callback: impl FnMut(&DownloadProgress) + Send + 'static,
    ) -> bool {
        self.shared.downloads.register_progress(file_id, callback)
    }

    pub fn unregister_progress(&self, file_id: FileId) -> bool {
        self.shared.downloads.unregister(file_id)
    }

    /// Start downloading `file`, reporting progress to `progress`.
    ///
    /// A file that is already complete resolves at once without a request,
    /// and so does one the backend reports complete in its answer; either
    /// way `progress` then runs on the calling thread.
    pub fn download_file(
        &self,
        file: &File,
        mut progress: impl FnMut(&DownloadProgress) + Send + 'static,
    ) -> Result<PendingDownload, InvocationError> {
        if file.local.is_downloading_completed {
            let done = DownloadProgress::from(file);
            progress(&done);
            return Ok(PendingDownload::ready(done));
        }
        if !file.local.can_be_downloaded {
            return Err(InvocationError::NotDownloadable(format!("file {}", file.id)));
        }

        let (tx, rx) = channel::bounded(1);
        let (entry, _) = self.shared.downloads.install(file.id, move |p| {
            progress(p);
            if p.completed {
                let _ = tx.try_send(p.clone());
            }
        });

        let request = functions::DownloadFile {
            file_id:     file.id,
            priority:    DOWNLOAD_PRIORITY,
            offset:      0,
            limit:       0,
            synchronous: false,
        };
        match self.invoke(request) {
            Ok(current) if current.local.is_downloading_completed => {
                self.shared.downloads.dispatch(&current);
            }
            Ok(_) => {}
            Err(e) => {
                self.shared.downloads.unregister_entry(file.id, &entry);
                return Err(e);
            }
        }
        Ok(PendingDownload::waiting(file.id, rx, &self.shared.downloads, entry))
    }

    /// Stop `download`: its callback is removed and the backend is asked to
    /// cancel the transfer.
    pub fn cancel_download(&self, download: PendingDownload) -> Result<(), InvocationError> {
        if download.is_ready() {
            return Ok(());
        }
        download.forget();
        self.invoke(functions::CancelDownloadFile { file_id: download.file_id(), only_if_pending: false })
            .map(drop)
    }

    /// Download the media of every message that has any and wait for all.
    ///
    /// Returns each file's display name and final state. Fails before starting
    /// anything if one of the files can not be downloaded.
    pub fn download_messages<F>(
        &self,
        messages: &[Message],
        progress: F,
    ) -> Result<Vec<(String, DownloadProgress)>, InvocationError>
    where
        F: Fn(&str, &DownloadProgress) + Send + Sync + 'static,
    {
        let mut files: Vec<(File, String)> = Vec::new();
        for m in messages {
            let Some((file, name)) = m.content.downloadable() else {
                tracing::debug!("[tdshell] Message {} ({}) has nothing to download", m.id, m.content.kind());
                continue;
            };
            if !file.local.can_be_downloaded && !file.local.is_downloading_completed {
                return Err(InvocationError::NotDownloadable(name));
            }
            if files.iter().all(|(f, _)| f.id != file.id) {
                files.push((file.clone(), name));
            }
        }

        let progress = Arc::new(progress);
        let mut pending = Vec::with_capacity(files.len());
        for (file, name) in files {
            let report = Arc::clone(&progress);
            let label = name.clone();
            match self.download_file(&file, move |p| (*report)(&label, p)) {
                Ok(download) => pending.push((name, download)),
                Err(e) => {
                    for (_, d) in &pending {
                        d.forget();
                    }
                    return Err(e);
                }
            }
        }

        pending
            .into_iter()
            .map(|(name, d)| d.wait().map(|p| (name, p)))
            .collect()
    }
}

impl HistorySource for Channel {
    fn history_page(
        &self,
        chat_id: ChatId,
        from_message_id: MessageId,
        limit: i32,
    ) -> Result<Vec<Message>, InvocationError> {
        self.fetch_history(chat_id, from_message_id, 0, limit)
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.stop();
    }
}
