//! Chat turn handlers, one per upstream transport.
//!
//! Both take a [`ChatCommand`] and an [`EventSink`](crate::application::relay::EventSink),
//! emit `start` before any upstream call, and end with exactly one
//! terminal event.

mod assistant_chat;
mod command;
mod stream_chat;

pub use assistant_chat::AssistantChatHandler;
pub use command::{ChatCommand, ChatReply};
pub use stream_chat::StreamChatHandler;
