//! Concrete objects exchanged with the backend.

use crate::enums::{ChatType, MessageContent, MessageSender};

/// Chat identifier.
pub type ChatId = i64;
/// Message identifier, unique within one chat.
pub type MessageId = i64;
/// User identifier.
pub type UserId = i64;
/// Backend-local file identifier.
pub type FileId = i32;

// ─── Generic results ──────────────────────────────────────────────────────────

/// Empty success answer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ok;

/// Failure answer for a specific request.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Error {
    /// Numeric error code (HTTP-like).
    pub code:    i32,
    /// Human-readable diagnostic, e.g. `PHONE_CODE_INVALID`.
    pub message: String,
}

// ─── Authorization ────────────────────────────────────────────────────────────

/// Parameters submitted while the backend waits for its initial configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameters {
    pub database_directory:       String,
    pub use_message_database:     bool,
    pub use_secret_chats:         bool,
    pub api_id:                   i32,
    pub api_hash:                 String,
    pub system_language_code:     String,
    pub device_model:             String,
    pub application_version:      String,
    pub enable_storage_optimizer: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            database_directory:       "tdlib".into(),
            use_message_database:     true,
            use_secret_chats:         true,
            api_id:                   0,
            api_hash:                 String::new(),
            system_language_code:     "en".into(),
            device_model:             "Desktop".into(),
            application_version:      env!("CARGO_PKG_VERSION").into(),
            enable_storage_optimizer: true,
        }
    }
}

// ─── Users & chats ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    pub id:         UserId,
    pub first_name: String,
    pub last_name:  String,
    pub username:   String,
}

impl User {
    /// `"First Last"`, trimmed when either part is empty.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chat {
    pub id:           ChatId,
    pub title:        String,
    pub chat_type:    ChatType,
    pub last_message: Option<Box<Message>>,
}

/// A list of chat identifiers, as returned by `getChats`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chats {
    pub total_count: i32,
    pub chat_ids:    Vec<ChatId>,
}

// ─── Messages ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub id:      MessageId,
    pub chat_id: ChatId,
    pub sender:  MessageSender,
    /// Unix timestamp of sending.
    pub date:    i32,
    pub content: MessageContent,
}

/// A page of messages, newest first.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Messages {
    pub total_count: i32,
    pub messages:    Vec<Message>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageLinkInfo {
    pub is_public: bool,
    pub chat_id:   ChatId,
    pub message:   Option<Message>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormattedText {
    pub text: String,
}

impl From<&str> for FormattedText {
    fn from(s: &str) -> Self { Self { text: s.to_string() } }
}

// ─── Files ────────────────────────────────────────────────────────────────────

/// Local state of a remote file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalFile {
    pub path:                     String,
    pub can_be_downloaded:        bool,
    pub is_downloading_active:    bool,
    pub is_downloading_completed: bool,
    pub downloaded_size:          i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct File {
    pub id:            FileId,
    /// Exact size, or 0 when unknown.
    pub size:          i64,
    pub expected_size: i64,
    pub local:         LocalFile,
}

impl File {
    /// Best known total size: the exact size when known, else the expected one.
    pub fn total_size(&self) -> i64 {
        if self.size > 0 { self.size } else { self.expected_size }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    pub file_name: String,
    pub mime_type: String,
    pub document:  File,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Video {
    pub file_name: String,
    pub duration:  i32,
    pub video:     File,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhotoSize {
    /// Thumbnail kind, e.g. `"s"`, `"m"`, `"x"`.
    pub kind:   String,
    pub width:  i32,
    pub height: i32,
    pub photo:  File,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Photo {
    pub sizes: Vec<PhotoSize>,
}

impl Photo {
    /// The size variant with the largest expected file size.
    pub fn largest(&self) -> Option<&PhotoSize> {
        self.sizes.iter().max_by_key(|s| s.photo.expected_size)
    }
}

/// A chunk of a locally available file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilePart {
    pub data: Vec<u8>,
}
