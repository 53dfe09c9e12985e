//! Sum types: requests, responses, pushes and their polymorphic parts.

use crate::functions;
use crate::types::{self, ChatId, Document, File, FormattedText, MessageId, Photo, UserId, Video};

// ─── Small enums ──────────────────────────────────────────────────────────────

/// Who sent a message.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageSender {
    User(UserId),
    Chat(ChatId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChatType {
    Private     { user_id: UserId },
    BasicGroup  { basic_group_id: i64 },
    Supergroup  { supergroup_id: i64, is_channel: bool },
    Secret      { secret_chat_id: i32, user_id: UserId },
}

/// Value of a backend option.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OptionValue {
    Empty,
    Boolean(bool),
    Integer(i64),
    String(String),
}

// ─── MessageContent ───────────────────────────────────────────────────────────

/// Content of a message.
///
/// Kinds this vocabulary does not model arrive as [`MessageContent::Unsupported`]
/// carrying the backend's kind name.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageContent {
    Text(FormattedText),
    Video     { video: Video, caption: FormattedText },
    Document  { document: Document, caption: FormattedText },
    Photo     { photo: Photo, caption: FormattedText },
    PinMessage { message_id: MessageId },
    /// A new member joined the chat via an invite link.
    ChatJoinByLink,
    /// A new member was accepted to the chat by an administrator.
    ChatJoinByRequest,
    Unsupported(String),
}

impl MessageContent {
    /// Short kind label: `"Text"`, `"Video"`, …
    pub fn kind(&self) -> &str {
        match self {
            Self::Text(_)           => "Text",
            Self::Video { .. }      => "Video",
            Self::Document { .. }   => "Document",
            Self::Photo { .. }      => "Photo",
            Self::PinMessage { .. } => "Pin",
            Self::ChatJoinByLink    => "Join",
            Self::ChatJoinByRequest => "Join",
            Self::Unsupported(kind) => kind,
        }
    }

    /// The file attached to this content and its display name.
    ///
    /// Documents and videos use their file name; photos use their largest
    /// size and the caption as name. Every other kind has nothing to download.
    pub fn downloadable(&self) -> Option<(&File, String)> {
        match self {
            Self::Document { document, .. } => Some((&document.document, document.file_name.clone())),
            Self::Video { video, .. }       => Some((&video.video, video.file_name.clone())),
            Self::Photo { photo, caption }  => photo.largest().map(|s| (&s.photo, caption.text.clone())),
            _ => None,
        }
    }
}

// ─── AuthorizationState ───────────────────────────────────────────────────────

/// Authorization progress reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuthorizationState {
    WaitParameters,
    WaitEncryptionKey { is_encrypted: bool },
    WaitPhoneNumber,
    WaitCode { phone_number: String },
    WaitRegistration,
    WaitPassword { password_hint: String },
    WaitOtherDeviceConfirmation { link: String },
    Ready,
    LoggingOut,
    Closing,
    Closed,
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// Unsolicited push from the backend.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Update {
    AuthorizationState(AuthorizationState),
    NewChat(types::Chat),
    ChatTitle { chat_id: ChatId, title: String },
    User(types::User),
    NewMessage(types::Message),
    /// State of a file changed (download progress, relocation, …).
    File(File),
    OptionChanged { name: String, value: OptionValue },
    /// Any push kind without a dedicated variant.
    Unsupported(String),
}

// ─── Object ───────────────────────────────────────────────────────────────────

/// Anything the backend can emit: a response to a request, or a push.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Object {
    Ok(types::Ok),
    Error(types::Error),
    OptionValue(OptionValue),
    Chats(types::Chats),
    Chat(types::Chat),
    Messages(types::Messages),
    Message(types::Message),
    MessageLinkInfo(types::MessageLinkInfo),
    File(File),
    FilePart(types::FilePart),
    User(types::User),
    Update(Update),
}

impl Object {
    /// Object kind name, as used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ok(_)              => "ok",
            Self::Error(_)           => "error",
            Self::OptionValue(_)     => "optionValue",
            Self::Chats(_)           => "chats",
            Self::Chat(_)            => "chat",
            Self::Messages(_)        => "messages",
            Self::Message(_)         => "message",
            Self::MessageLinkInfo(_) => "messageLinkInfo",
            Self::File(_)            => "file",
            Self::FilePart(_)        => "filePart",
            Self::User(_)            => "user",
            Self::Update(_)          => "update",
        }
    }
}

macro_rules! into_object {
    ($($variant:ident => $ty:ty;)*) => {
        $(
            impl From<$ty> for Object {
                fn from(v: $ty) -> Self { Object::$variant(v) }
            }
        )*
    };
}

into_object! {
    Ok              => types::Ok;
    Error           => types::Error;
    OptionValue     => OptionValue;
    Chats           => types::Chats;
    Chat            => types::Chat;
    Messages        => types::Messages;
    Message         => types::Message;
    MessageLinkInfo => types::MessageLinkInfo;
    File            => File;
    FilePart        => types::FilePart;
    User            => types::User;
    Update          => Update;
}

// ─── Function ─────────────────────────────────────────────────────────────────

/// Any request the backend understands.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Function {
    GetOption(functions::GetOption),
    SetLogVerbosityLevel(functions::SetLogVerbosityLevel),
    SetParameters(functions::SetParameters),
    CheckDatabaseEncryptionKey(functions::CheckDatabaseEncryptionKey),
    Destroy(functions::Destroy),
    SetAuthenticationPhoneNumber(functions::SetAuthenticationPhoneNumber),
    CheckAuthenticationCode(functions::CheckAuthenticationCode),
    RegisterUser(functions::RegisterUser),
    CheckAuthenticationPassword(functions::CheckAuthenticationPassword),
    LogOut(functions::LogOut),
    Close(functions::Close),
    GetChats(functions::GetChats),
    GetChat(functions::GetChat),
    GetUser(functions::GetUser),
    GetChatHistory(functions::GetChatHistory),
    GetMessage(functions::GetMessage),
    GetMessageLinkInfo(functions::GetMessageLinkInfo),
    GetChatMessageByDate(functions::GetChatMessageByDate),
    DownloadFile(functions::DownloadFile),
    CancelDownloadFile(functions::CancelDownloadFile),
    OpenMessageContent(functions::OpenMessageContent),
    ReadFilePart(functions::ReadFilePart),
}

impl Function {
    /// Backend method name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetOption(_)                    => "getOption",
            Self::SetLogVerbosityLevel(_)         => "setLogVerbosityLevel",
            Self::SetParameters(_)                => "setTdlibParameters",
            Self::CheckDatabaseEncryptionKey(_)   => "checkDatabaseEncryptionKey",
            Self::Destroy(_)                      => "destroy",
            Self::SetAuthenticationPhoneNumber(_) => "setAuthenticationPhoneNumber",
            Self::CheckAuthenticationCode(_)      => "checkAuthenticationCode",
            Self::RegisterUser(_)                 => "registerUser",
            Self::CheckAuthenticationPassword(_)  => "checkAuthenticationPassword",
            Self::LogOut(_)                       => "logOut",
            Self::Close(_)                        => "close",
            Self::GetChats(_)                     => "getChats",
            Self::GetChat(_)                      => "getChat",
            Self::GetUser(_)                      => "getUser",
            Self::GetChatHistory(_)               => "getChatHistory",
            Self::GetMessage(_)                   => "getMessage",
            Self::GetMessageLinkInfo(_)           => "getMessageLinkInfo",
            Self::GetChatMessageByDate(_)         => "getChatMessageByDate",
            Self::DownloadFile(_)                 => "downloadFile",
            Self::CancelDownloadFile(_)           => "cancelDownloadFile",
            Self::OpenMessageContent(_)           => "openMessageContent",
            Self::ReadFilePart(_)                 => "readFilePart",
        }
    }
}
