//! All messages between two messages of one chat.
//!
//! [`RangeResolver`] walks history backwards from the later endpoint, one
//! two-message page at a time, until it reaches the earlier endpoint. Each
//! page is anchored at the current *frontier* and yields the frontier itself
//! plus the next older message.
//!
//! The walk is bounded: if the earlier endpoint is not on the history chain
//! behind the later one (deleted messages, wrong input), it fails with
//! [`RangeError::NotFound`] instead of walking forever.

use tdshell_types::types::{ChatId, Message, MessageId};

use crate::errors::{InvocationError, RangeError};

// ─── HistorySource ────────────────────────────────────────────────────────────

/// Paged access to a chat's history, newest first.
pub trait HistorySource {
    /// Up to `limit` messages starting at `from_message_id` and going back.
    fn history_page(
        &self,
        chat_id:         ChatId,
        from_message_id: MessageId,
        limit:           i32,
    ) -> Result<Vec<Message>, InvocationError>;
}

// ─── RangeResolver ────────────────────────────────────────────────────────────

pub struct RangeResolver<'a, S: HistorySource + ?Sized> {
    source:       &'a S,
    max_messages: usize,
}

/// Chronological sort key within one chat.
fn key(m: &Message) -> (i32, MessageId) {
    (m.date, m.id)
}

impl<'a, S: HistorySource + ?Sized> RangeResolver<'a, S> {
    /// A resolver that gives up once a range would exceed `max_messages`.
    pub fn new(source: &'a S, max_messages: usize) -> Self {
        Self { source, max_messages: max_messages.max(1) }
    }

    /// Messages from the later of `from` and `to` back to the earlier one,
    /// both included, newest first.
    ///
    /// Identical endpoints give an empty range. Both endpoints must belong to
    /// `chat_id`; that is checked before any history is fetched.
    pub fn resolve(
        &self,
        chat_id: ChatId,
        from:    &Message,
        to:      &Message,
    ) -> Result<Vec<Message>, RangeError> {
        if from.chat_id != to.chat_id {
            return Err(RangeError::CrossConversation { from: from.chat_id, to: to.chat_id });
        }
        if from.chat_id != chat_id {
            return Err(RangeError::CrossConversation { from: chat_id, to: from.chat_id });
        }
        if from.id == to.id {
            return Ok(Vec::new());
        }

        let (later, earlier) = if key(from) > key(to) { (from, to) } else { (to, from) };
        let not_found = |visited: usize| RangeError::NotFound { from: later.id, to: earlier.id, visited };

        let mut range = vec![later.clone()];
        let mut frontier = later.clone();
        while frontier.id != earlier.id {
            if range.len() >= self.max_messages {
                tracing::warn!(
                    "[tdshell] Range {}..{} in chat {chat_id} exceeds {} messages",
                    later.id, earlier.id, self.max_messages
                );
                return Err(not_found(range.len()));
            }

            let page = self.source.history_page(chat_id, frontier.id, 2)?;
            let Some(next) = page.into_iter().find(|m| m.id != frontier.id) else {
                return Err(not_found(range.len()));
            };
            // Must be strictly older than the frontier and not past the target.
            if key(&next) >= key(&frontier) || key(&next) < key(earlier) {
                return Err(not_found(range.len()));
            }

            range.push(next.clone());
            frontier = next;
        }
        Ok(range)
    }
}
