//! Classification of inbound backend events.
//!
//! Everything the transport yields is either the answer to a request
//! (non-zero correlation id) or an unsolicited push (id `0`). Pushes are
//! further split into the kinds the channel maintains state for; the rest
//! are passed through as [`Push::Other`].

use tdshell_types::enums::{AuthorizationState, Update};
use tdshell_types::types::{ChatId, File, User};
use tdshell_types::Object;

use crate::transport::{Response, PUSH_ID};

// ─── Routed ───────────────────────────────────────────────────────────────────

/// Where an inbound event goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// Answer to request `id`, for the request table.
    Response { id: u64, object: Object },
    /// Unsolicited push.
    Push(Push),
    /// Sent under the push id but not a push at all. Logged and dropped.
    Malformed(Object),
}

/// Unsolicited pushes, by the component that consumes them.
#[derive(Debug, Clone, PartialEq)]
pub enum Push {
    /// Authorization progress, for the authorization driver.
    Authorization(AuthorizationState),
    /// A chat became known or was renamed, for the chat directory.
    ChatTitle { chat_id: ChatId, title: String },
    /// A user became known or changed, for the user directory.
    User(User),
    /// File state changed, for the download registry.
    File(File),
    /// Anything else: new messages, option changes, unsupported kinds.
    Other(Update),
}

/// Classify one inbound event.
pub fn route(response: Response) -> Routed {
    if response.request_id != PUSH_ID {
        return Routed::Response { id: response.request_id, object: response.object };
    }
    match response.object {
        Object::Update(update) => Routed::Push(Push::from(update)),
        other                  => Routed::Malformed(other),
    }
}

impl From<Update> for Push {
    fn from(update: Update) -> Self {
        match update {
            Update::AuthorizationState(s)       => Self::Authorization(s),
            Update::NewChat(chat)               => Self::ChatTitle { chat_id: chat.id, title: chat.title },
            Update::ChatTitle { chat_id, title } => Self::ChatTitle { chat_id, title },
            Update::User(u)                     => Self::User(u),
            Update::File(f)                     => Self::File(f),
            other                               => Self::Other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tdshell_types::enums::ChatType;
    use tdshell_types::types;

    fn push(object: Object) -> Response {
        Response { request_id: PUSH_ID, object }
    }

    #[test]
    fn nonzero_id_is_a_response_even_for_update_objects() {
        let obj = Object::Update(Update::Unsupported("updateFoo".into()));
        assert_eq!(
            route(Response { request_id: 9, object: obj.clone() }),
            Routed::Response { id: 9, object: obj },
        );
    }

    #[test]
    fn push_id_with_plain_object_is_malformed() {
        assert_eq!(route(push(Object::Ok(types::Ok))), Routed::Malformed(Object::Ok(types::Ok)));
    }

    #[test]
    fn new_chat_and_title_change_both_feed_the_directory() {
        let chat = types::Chat {
            id: -100, title: "Lounge".into(),
            chat_type: ChatType::BasicGroup { basic_group_id: 100 },
            last_message: None,
        };
        let expected = Routed::Push(Push::ChatTitle { chat_id: -100, title: "Lounge".into() });
        assert_eq!(route(push(Object::Update(Update::NewChat(chat)))), expected);
        assert_eq!(
            route(push(Object::Update(Update::ChatTitle { chat_id: -100, title: "Lounge".into() }))),
            expected,
        );
    }

    #[test]
    fn unhandled_kinds_pass_through() {
        let u = Update::OptionChanged { name: "version".into(), value: tdshell_types::enums::OptionValue::Empty };
        assert_eq!(route(push(Object::Update(u.clone()))), Routed::Push(Push::Other(u)));
    }
}
