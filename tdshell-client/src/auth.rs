//! The login state machine.
//!
//! [`AuthorizationDriver`] consumes authorization-state pushes and answers
//! each with the next request to send, as an [`AuthAction`]. It performs no
//! I/O besides asking its [`CredentialPrompt`]; the channel executes the
//! actions it returns.
//!
//! Every state push bumps the *epoch*. A submission carries the epoch it was
//! made in, and its response is ignored when the epoch has moved on since, so
//! a slow answer to an old prompt can never act on a newer state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tdshell_types::enums::AuthorizationState;
use tdshell_types::types::Parameters;
use tdshell_types::{functions, Function, Object};

use crate::credentials::CredentialPrompt;
use crate::Config;

/// Encryption-key answer that destroys the local database instead.
pub const DESTROY_SENTINEL: &str = "DESTROY";

// ─── AuthAction ───────────────────────────────────────────────────────────────

/// What the channel must do after the driver observed something.
#[derive(Clone, Debug, PartialEq)]
pub enum AuthAction {
    /// Send `function`; feed its response back with `epoch`.
    Submit { function: Function, epoch: u64 },
    /// Authorization completed.
    Authorized,
    /// The account is logging out.
    LoggedOut,
    /// The backend instance is closed and must be recreated.
    Closed,
    /// Authorization can not continue.
    Fatal(String),
    /// Nothing to do until the next state push.
    Wait,
}

// ─── AuthorizationDriver ──────────────────────────────────────────────────────

pub struct AuthorizationDriver {
    epoch:                    Arc<AtomicU64>,
    state:                    Option<AuthorizationState>,
    key_attempts:             u32,
    parameter_attempts:       u32,
    max_key_attempts:         u32,
    parameters:               Parameters,
    encryption_key:           Option<String>,
    use_empty_encryption_key: bool,
    prompt:                   Arc<dyn CredentialPrompt>,
}

impl AuthorizationDriver {
    pub fn new(config: &Config) -> Self {
        Self {
            epoch:                    Arc::new(AtomicU64::new(0)),
            state:                    None,
            key_attempts:             0,
            parameter_attempts:       0,
            max_key_attempts:         config.max_key_attempts,
            parameters:               config.parameters.clone(),
            encryption_key:           config.encryption_key.clone(),
            use_empty_encryption_key: config.use_empty_encryption_key,
            prompt:                   Arc::clone(&config.credentials),
        }
    }

    pub fn epoch(&self) -> u64 { self.epoch.load(Ordering::SeqCst) }

    /// The epoch counter itself, readable without holding the driver.
    pub fn epoch_counter(&self) -> Arc<AtomicU64> { Arc::clone(&self.epoch) }

    /// The last state the backend reported.
    pub fn state(&self) -> Option<&AuthorizationState> { self.state.as_ref() }

    /// Encryption keys submitted since authorization last moved past that step.
    pub fn key_attempts(&self) -> u32 { self.key_attempts }

    /// Parameter submissions since authorization last moved past that step.
    pub fn parameter_attempts(&self) -> u32 { self.parameter_attempts }

    /// The backend reported a new authorization state.
    pub fn on_state(&mut self, state: AuthorizationState) -> AuthAction {
        if !matches!(state, AuthorizationState::WaitEncryptionKey { .. }) {
            self.key_attempts = 0;
        }
        if state != AuthorizationState::WaitParameters {
            self.parameter_attempts = 0;
        }
        self.state = Some(state);
        self.advance()
    }

    /// The backend answered a submission made in `epoch`.
    ///
    /// Stale answers are ignored. A failed current submission replays the
    /// current state, which prompts again.
    pub fn on_submission_result(&mut self, epoch: u64, result: &Object) -> AuthAction {
        let current = self.epoch();
        if epoch != current {
            tracing::debug!("[tdshell] Ignoring authorization answer from epoch {epoch} (now {current})");
            return AuthAction::Wait;
        }
        match result {
            Object::Error(e) => {
                tracing::warn!("[tdshell] Authorization step failed: {} {}", e.code, e.message);
                self.advance()
            }
            _ => AuthAction::Wait,
        }
    }

    fn advance(&mut self) -> AuthAction {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let Some(state) = self.state.clone() else { return AuthAction::Wait };

        match state {
            AuthorizationState::WaitParameters => self.parameters_step(),
            AuthorizationState::WaitEncryptionKey { is_encrypted } => self.encryption_key_step(is_encrypted),
            AuthorizationState::WaitPhoneNumber => match self.ask("Enter phone number: ") {
                Ok(phone_number) => self.submit(functions::SetAuthenticationPhoneNumber { phone_number }),
                Err(a) => a,
            },
            AuthorizationState::WaitCode { .. } => match self.ask("Enter authentication code: ") {
                Ok(code) => self.submit(functions::CheckAuthenticationCode { code }),
                Err(a) => a,
            },
            AuthorizationState::WaitRegistration => {
                let first_name = match self.ask("Enter your first name: ") { Ok(v) => v, Err(a) => return a };
                let last_name  = match self.ask("Enter your last name: ")  { Ok(v) => v, Err(a) => return a };
                self.submit(functions::RegisterUser { first_name, last_name })
            }
            AuthorizationState::WaitPassword { password_hint } => {
                let label = if password_hint.is_empty() {
                    "Enter authentication password: ".to_string()
                } else {
                    format!("Enter authentication password (hint: {password_hint}): ")
                };
                match self.ask(&label) {
                    Ok(password) => self.submit(functions::CheckAuthenticationPassword { password }),
                    Err(a) => a,
                }
            }
            AuthorizationState::WaitOtherDeviceConfirmation { link } => {
                tracing::info!("[tdshell] Confirm this login link on another device: {link}");
                AuthAction::Wait
            }
            AuthorizationState::Ready => AuthAction::Authorized,
            AuthorizationState::LoggingOut => AuthAction::LoggedOut,
            AuthorizationState::Closing => {
                tracing::info!("[tdshell] Closing …");
                AuthAction::Wait
            }
            AuthorizationState::Closed => AuthAction::Closed,
        }
    }

    /// Parameters only ever come from configuration; rejections count
    /// against the same cap as encryption keys.
    fn parameters_step(&mut self) -> AuthAction {
        if self.parameter_attempts >= self.max_key_attempts {
            return AuthAction::Fatal(format!(
                "backend parameters rejected {} times",
                self.parameter_attempts
            ));
        }
        self.parameter_attempts += 1;
        self.submit(functions::SetParameters { parameters: self.parameters.clone() })
    }

    fn encryption_key_step(&mut self, is_encrypted: bool) -> AuthAction {
        if self.key_attempts >= self.max_key_attempts {
            return AuthAction::Fatal(format!(
                "database encryption key rejected {} times",
                self.key_attempts
            ));
        }
        self.key_attempts += 1;

        let key = if self.use_empty_encryption_key {
            String::new()
        } else if let Some(key) = &self.encryption_key {
            key.clone()
        } else {
            match self.ask("Enter encryption key or DESTROY: ") {
                Ok(k) => k,
                Err(a) => return a,
            }
        };
        tracing::debug!(
            "[tdshell] Encryption key attempt {}/{} (database encrypted: {is_encrypted})",
            self.key_attempts, self.max_key_attempts
        );

        if key == DESTROY_SENTINEL {
            tracing::warn!("[tdshell] Destroying local database");
            self.submit(functions::Destroy)
        } else {
            self.submit(functions::CheckDatabaseEncryptionKey { encryption_key: key })
        }
    }

    fn submit(&self, function: impl Into<Function>) -> AuthAction {
        AuthAction::Submit { function: function.into(), epoch: self.epoch() }
    }

    fn ask(&self, label: &str) -> Result<String, AuthAction> {
        self.prompt
            .prompt(label)
            .map_err(|e| AuthAction::Fatal(format!("credential prompt failed: {e}")))
    }
}
