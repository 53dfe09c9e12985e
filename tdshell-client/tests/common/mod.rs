#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use tdshell_client::types::enums::{MessageContent, MessageSender};
use tdshell_client::types::types::{ChatId, Message, MessageId, Messages};
use tdshell_client::types::{Function, Object};
use tdshell_client::{BackendHandle, Channel, Config, MemoryTransport};

pub const WAIT: Duration = Duration::from_secs(2);
pub const QUIET: Duration = Duration::from_millis(100);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A channel over an in-memory transport, start-up requests already consumed.
pub fn channel(config: Config) -> (Channel, BackendHandle) {
    init_logging();
    let (transport, backend) = MemoryTransport::pair();
    let channel = Channel::new(config, Arc::new(transport)).unwrap();
    let startup: Vec<_> = backend.drain_requests().into_iter().map(|(_, f)| f.name()).collect();
    assert_eq!(startup, ["setLogVerbosityLevel", "getOption"]);
    (channel, backend)
}

/// The next request, which must be a `name` call.
pub fn expect(backend: &BackendHandle, name: &str) -> (u64, Function) {
    let (id, f) = backend.next_request(WAIT).unwrap_or_else(|| panic!("no {name} request"));
    assert_eq!(f.name(), name, "unexpected request {f:?}");
    (id, f)
}

/// Poll `cond` until it holds or [`WAIT`] passes.
pub fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

pub fn text(chat_id: ChatId, id: MessageId, date: i32) -> Message {
    Message {
        id,
        chat_id,
        sender:  MessageSender::User(1),
        date,
        content: MessageContent::Text(format!("message {id}").as_str().into()),
    }
}

/// Answer `getChatHistory` from `history` (any order) until the channel goes
/// quiet for [`QUIET`]. Returns how many pages were served.
pub fn serve_history(backend: &BackendHandle, history: &[Message]) -> usize {
    let mut newest_first = history.to_vec();
    newest_first.sort_by_key(|m| std::cmp::Reverse((m.date, m.id)));

    let mut served = 0;
    while let Some((id, f)) = backend.next_request(QUIET) {
        let Function::GetChatHistory(req) = f else {
            panic!("unexpected request {f:?}");
        };
        let start = newest_first
            .iter()
            .position(|m| m.chat_id == req.chat_id && m.id == req.from_message_id)
            .unwrap_or(newest_first.len());
        let messages: Vec<Message> = newest_first[start..]
            .iter()
            .filter(|m| m.chat_id == req.chat_id)
            .take(req.limit as usize)
            .cloned()
            .collect();
        backend.reply(id, Object::Messages(Messages { total_count: messages.len() as i32, messages }));
        served += 1;
    }
    served
}
