//! Typed vocabulary of the tdshell backend channel.
//!
//! The backend is reached through an opaque duplex channel that carries
//! already-typed function calls in one direction and typed objects (responses
//! and unsolicited pushes) in the other. This crate defines that vocabulary
//! and nothing else: there is no wire encoding here.
//!
//! # Overview
//!
//! | Module        | Contents                                                       |
//! |---------------|----------------------------------------------------------------|
//! | [`types`]     | Concrete objects (chats, users, messages, files, errors)       |
//! | [`functions`] | Requests as `struct`s implementing [`RemoteCall`]              |
//! | [`enums`]     | Sum types: [`enums::Function`], [`enums::Object`], updates, …  |
//!
//! # Usage
//!
//! ```rust
//! use tdshell_types::{functions, enums::Function, RemoteCall};
//!
//! fn wire<R: RemoteCall>(req: R) -> Function { req.into() }
//!
//! let f = wire(functions::GetChat { chat_id: 42 });
//! assert_eq!(f.name(), "getChat");
//! ```

#![deny(unsafe_code)]
#![allow(clippy::large_enum_variant)]

pub mod enums;
pub mod functions;
pub mod types;

pub use enums::{Function, Object};

// ─── Core traits ──────────────────────────────────────────────────────────────

/// Marks a request type that can be sent to the backend.
///
/// `Return` is the object kind the backend answers with on success.
pub trait RemoteCall: Into<Function> {
    /// The typed response.
    type Return: FromObject;
}

/// Extraction of a concrete response type out of a generic [`Object`].
pub trait FromObject: Sized {
    /// Name of the expected object kind, used in mismatch diagnostics.
    const KIND: &'static str;

    /// Returns the object back unchanged when it is of another kind.
    fn from_object(object: Object) -> Result<Self, Object>;
}

macro_rules! from_object {
    ($($variant:ident => $ty:ty, $kind:literal;)*) => {
        $(
            impl FromObject for $ty {
                const KIND: &'static str = $kind;

                fn from_object(object: Object) -> Result<Self, Object> {
                    match object {
                        Object::$variant(v) => Ok(v),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

from_object! {
    Ok              => types::Ok,              "ok";
    OptionValue     => enums::OptionValue,     "optionValue";
    Chats           => types::Chats,           "chats";
    Chat            => types::Chat,            "chat";
    Messages        => types::Messages,        "messages";
    Message         => types::Message,         "message";
    MessageLinkInfo => types::MessageLinkInfo, "messageLinkInfo";
    File            => types::File,            "file";
    FilePart        => types::FilePart,        "filePart";
    User            => types::User,            "user";
}
