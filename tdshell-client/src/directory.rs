//! Chat and user caches fed by pushes.
//!
//! Entries are added or overwritten, never invalidated. Title lookups scan
//! chats in ascending id order and return the first match, so duplicate
//! titles always resolve to the smallest chat id.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use tdshell_types::types::{ChatId, User, UserId};

#[derive(Default)]
pub struct ChatDirectory {
    chats: RwLock<BTreeMap<ChatId, String>>,
    users: RwLock<HashMap<UserId, User>>,
}

impl ChatDirectory {
    pub fn new() -> Self { Self::default() }

    pub fn insert_chat(&self, chat_id: ChatId, title: impl Into<String>) {
        self.chats.write().insert(chat_id, title.into());
    }

    pub fn chat_title(&self, chat_id: ChatId) -> Option<String> {
        self.chats.read().get(&chat_id).cloned()
    }

    /// The first chat, by id, titled exactly `title`.
    pub fn find_chat(&self, title: &str) -> Option<ChatId> {
        self.chats.read().iter().find(|(_, t)| t.as_str() == title).map(|(id, _)| *id)
    }

    /// All known chats, by id.
    pub fn chats(&self) -> Vec<(ChatId, String)> {
        self.chats.read().iter().map(|(id, t)| (*id, t.clone())).collect()
    }

    pub fn insert_user(&self, user: User) {
        self.users.write().insert(user.id, user);
    }

    pub fn user(&self, user_id: UserId) -> Option<User> {
        self.users.read().get(&user_id).cloned()
    }
}
