//! Application handlers.
//!
//! Command handlers that orchestrate a chat turn across the ports.

pub mod chat;

pub use chat::{AssistantChatHandler, ChatCommand, ChatReply, StreamChatHandler};
