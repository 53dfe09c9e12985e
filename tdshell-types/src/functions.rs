//! Requests, one `struct` per backend method.
//!
//! Every request implements [`RemoteCall`] and converts into
//! [`Function`] for transmission.

use crate::enums::{Function, OptionValue};
use crate::types::{self, ChatId, FileId, MessageId, Parameters, UserId};
use crate::RemoteCall;

macro_rules! remote_call {
    ($($name:ident => $ret:ty;)*) => {
        $(
            impl RemoteCall for $name {
                type Return = $ret;
            }

            impl From<$name> for Function {
                fn from(f: $name) -> Self { Function::$name(f) }
            }
        )*
    };
}

// ─── Options & logging ────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GetOption {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetLogVerbosityLevel {
    pub new_verbosity_level: i32,
}

// ─── Authorization ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetParameters {
    pub parameters: Parameters,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CheckDatabaseEncryptionKey {
    pub encryption_key: String,
}

/// Destroy the local database and all data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Destroy;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetAuthenticationPhoneNumber {
    pub phone_number: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CheckAuthenticationCode {
    pub code: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegisterUser {
    pub first_name: String,
    pub last_name:  String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CheckAuthenticationPassword {
    pub password: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogOut;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Close;

// ─── Chats & users ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GetChats {
    pub limit: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GetChat {
    pub chat_id: ChatId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GetUser {
    pub user_id: UserId,
}

// ─── Messages ─────────────────────────────────────────────────────────────────

/// A page of history, newest first.
///
/// With `offset == 0` the page starts at `from_message_id` itself and
/// continues with older messages; a negative offset additionally returns
/// up to `-offset` newer messages.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GetChatHistory {
    pub chat_id:         ChatId,
    pub from_message_id: MessageId,
    pub offset:          i32,
    pub limit:           i32,
    pub only_local:      bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GetMessage {
    pub chat_id:    ChatId,
    pub message_id: MessageId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GetMessageLinkInfo {
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GetChatMessageByDate {
    pub chat_id: ChatId,
    /// Unix timestamp.
    pub date:    i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpenMessageContent {
    pub chat_id:    ChatId,
    pub message_id: MessageId,
}

// ─── Files ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DownloadFile {
    pub file_id:     FileId,
    /// 1..=32, higher downloads first.
    pub priority:    i32,
    pub offset:      i64,
    /// 0 downloads the whole file.
    pub limit:       i64,
    /// When `false` the backend answers immediately and reports progress via
    /// file pushes.
    pub synchronous: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CancelDownloadFile {
    pub file_id:            FileId,
    pub only_if_pending:    bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadFilePart {
    pub file_id: FileId,
    pub offset:  i64,
    /// 0 reads up to the end of the file.
    pub count:   i64,
}

remote_call! {
    GetOption                    => OptionValue;
    SetLogVerbosityLevel         => types::Ok;
    SetParameters                => types::Ok;
    CheckDatabaseEncryptionKey   => types::Ok;
    Destroy                      => types::Ok;
    SetAuthenticationPhoneNumber => types::Ok;
    CheckAuthenticationCode      => types::Ok;
    RegisterUser                 => types::Ok;
    CheckAuthenticationPassword  => types::Ok;
    LogOut                       => types::Ok;
    Close                        => types::Ok;
    GetChats                     => types::Chats;
    GetChat                      => types::Chat;
    GetUser                      => types::User;
    GetChatHistory               => types::Messages;
    GetMessage                   => types::Message;
    GetMessageLinkInfo           => types::MessageLinkInfo;
    GetChatMessageByDate         => types::Message;
    OpenMessageContent           => types::Ok;
    DownloadFile                 => types::File;
    CancelDownloadFile           => types::Ok;
    ReadFilePart                 => types::FilePart;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FromObject, Object};

    #[test]
    fn request_converts_into_named_function() {
        let f: Function = GetChatHistory {
            chat_id: 1, from_message_id: 10, offset: 0, limit: 2, only_local: false,
        }.into();
        assert_eq!(f.name(), "getChatHistory");

        let f: Function = CancelDownloadFile { file_id: 3, only_if_pending: false }.into();
        assert_eq!(f.name(), "cancelDownloadFile");
    }

    #[test]
    fn return_type_extracts_matching_object_only() {
        let file = types::File { id: 7, ..Default::default() };
        let got = <DownloadFile as RemoteCall>::Return::from_object(Object::File(file.clone()));
        assert_eq!(got, Ok(file));

        let wrong = <GetChat as RemoteCall>::Return::from_object(Object::Ok(types::Ok));
        assert_eq!(wrong.map(|c| c.id), Err(Object::Ok(types::Ok)));
        assert_eq!(<GetChat as RemoteCall>::Return::KIND, "chat");
    }
}
