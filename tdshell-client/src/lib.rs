//! # tdshell-client
//!
//! Blocking client channel over a callback-driven Telegram backend.
//!
//! The backend is an opaque duplex [`Transport`]: requests go out tagged with
//! a correlation id, and answers and unsolicited pushes come back interleaved
//! on one receive path. A [`Channel`] owns the single thread that drains it,
//! and turns that into plain blocking calls.
//!
//! ## Features
//! - `invoke` from any number of threads; every call gets exactly its own answer
//! - Bounded-wait `invoke_timeout` that never leaks its slot
//! - Login driven by pushed authorization states, epoch-fenced, with a capped
//!   number of database-key attempts
//! - Per-file download progress callbacks, batch downloads of message media
//! - Chat and user caches kept current from pushes
//! - Chronological message ranges walked from paged history, with a bound
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tdshell_client::{Channel, Config, MemoryTransport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (transport, _backend) = MemoryTransport::pair();
//! let channel = Channel::new(Config::from_env(), Arc::new(transport))?;
//! channel.start()?;
//! channel.wait_for_login()?;
//! for (id, title) in channel.chats(20)? {
//!     println!("{id}\t{title}");
//! }
//! # Ok(()) }
//! ```

#![deny(unsafe_code)]

mod channel;
mod errors;

pub mod auth;
pub mod credentials;
pub mod directory;
pub mod downloads;
pub mod range;
pub mod request_table;
pub mod transport;
pub mod update;

pub use channel::{parse_history_date, Channel, HISTORY_DATE_FORMAT};
pub use credentials::{CredentialPrompt, ScriptedPrompt, StdinPrompt};
pub use directory::ChatDirectory;
pub use downloads::{DownloadProgress, DownloadRegistry, PendingDownload};
pub use errors::{AuthError, InvocationError, RangeError, RpcError};
pub use range::{HistorySource, RangeResolver};
pub use request_table::RequestTable;
pub use transport::{BackendHandle, MemoryTransport, Response, Transport};

pub use tdshell_types as types;

use std::sync::Arc;
use std::time::Duration;

use tdshell_types::types::Parameters;

// ─── Config ───────────────────────────────────────────────────────────────────

/// Configuration for [`Channel::new`].
#[derive(Clone)]
pub struct Config {
    /// Submitted when the backend waits for its initial parameters.
    pub parameters:               Parameters,
    /// Database encryption key. Prompted for when `None`.
    pub encryption_key:           Option<String>,
    /// Submit an empty encryption key without prompting.
    pub use_empty_encryption_key: bool,
    /// Encryption keys, and separately parameter sets, the backend may
    /// reject before login fails for good (default: 3).
    pub max_key_attempts:         u32,
    /// How long one receive poll may block. Bounds shutdown latency.
    pub poll_timeout:             Duration,
    /// How often [`Channel::wait_for_login`] rechecks while the loop runs.
    pub login_poll_interval:      Duration,
    /// Upper bound on the length of a resolved message range.
    pub max_range_messages:       usize,
    /// Backend log verbosity, sent once on construction.
    pub log_verbosity:            i32,
    /// Source of credentials the configuration does not supply
    /// (default: [`StdinPrompt`]).
    pub credentials:              Arc<dyn CredentialPrompt>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parameters:               Parameters::default(),
            encryption_key:           None,
            use_empty_encryption_key: false,
            max_key_attempts:         3,
            poll_timeout:             Duration::from_millis(5),
            login_poll_interval:      Duration::from_millis(10),
            max_range_messages:       10_000,
            log_verbosity:            1,
            credentials:              Arc::new(StdinPrompt),
        }
    }
}

impl Config {
    /// Defaults, overridden by the `TDSHELL_*` environment variables.
    ///
    /// | Variable                       | Field                           |
    /// |--------------------------------|---------------------------------|
    /// | `TDSHELL_DATABASE_DIR`         | `parameters.database_directory` |
    /// | `TDSHELL_API_ID`               | `parameters.api_id`             |
    /// | `TDSHELL_API_HASH`             | `parameters.api_hash`           |
    /// | `TDSHELL_ENCRYPTION_KEY`       | `encryption_key`                |
    /// | `TDSHELL_EMPTY_ENCRYPTION_KEY` | `use_empty_encryption_key`      |
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(dir) = var("TDSHELL_DATABASE_DIR") {
            cfg.parameters.database_directory = dir;
        }
        if let Some(raw) = var("TDSHELL_API_ID") {
            match raw.trim().parse() {
                Ok(id) => cfg.parameters.api_id = id,
                Err(_) => tracing::warn!("[tdshell] Ignoring non-numeric TDSHELL_API_ID {raw:?}"),
            }
        }
        if let Some(hash) = var("TDSHELL_API_HASH") {
            cfg.parameters.api_hash = hash;
        }
        if let Some(key) = var("TDSHELL_ENCRYPTION_KEY") {
            cfg.encryption_key = Some(key);
        }
        if let Some(flag) = var("TDSHELL_EMPTY_ENCRYPTION_KEY") {
            cfg.use_empty_encryption_key =
                matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        cfg
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_api(mut self, api_id: i32, api_hash: impl Into<String>) -> Self {
        self.parameters.api_id = api_id;
        self.parameters.api_hash = api_hash.into();
        self
    }

    pub fn with_database_directory(mut self, dir: impl Into<String>) -> Self {
        self.parameters.database_directory = dir.into();
        self
    }

    pub fn with_encryption_key(mut self, key: impl Into<String>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }

    pub fn with_empty_encryption_key(mut self, yes: bool) -> Self {
        self.use_empty_encryption_key = yes;
        self
    }

    pub fn with_max_key_attempts(mut self, n: u32) -> Self {
        self.max_key_attempts = n;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_login_poll_interval(mut self, interval: Duration) -> Self {
        self.login_poll_interval = interval;
        self
    }

    pub fn with_max_range_messages(mut self, n: usize) -> Self {
        self.max_range_messages = n;
        self
    }

    pub fn with_log_verbosity(mut self, level: i32) -> Self {
        self.log_verbosity = level;
        self
    }

    pub fn with_credentials(mut self, prompt: Arc<dyn CredentialPrompt>) -> Self {
        self.credentials = prompt;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.max_key_attempts, 3);
        assert_eq!(c.poll_timeout, Duration::from_millis(5));
        assert_eq!(c.parameters.database_directory, "tdlib");
        assert!(c.encryption_key.is_none());
    }

    #[test]
    fn lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("TDSHELL_DATABASE_DIR", "/var/lib/tdshell"),
            ("TDSHELL_API_ID", "94575"),
            ("TDSHELL_API_HASH", "abc"),
            ("TDSHELL_EMPTY_ENCRYPTION_KEY", "True"),
        ]
        .into_iter()
        .collect();
        let c = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(c.parameters.database_directory, "/var/lib/tdshell");
        assert_eq!(c.parameters.api_id, 94575);
        assert_eq!(c.parameters.api_hash, "abc");
        assert!(c.use_empty_encryption_key);
        assert!(c.encryption_key.is_none());
    }

    #[test]
    fn bad_api_id_keeps_default() {
        let c = Config::from_lookup(|k| (k == "TDSHELL_API_ID").then(|| "twelve".to_string()));
        assert_eq!(c.parameters.api_id, 0);
    }
}
