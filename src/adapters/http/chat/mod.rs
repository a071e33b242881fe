//! Chat HTTP adapter.

mod dto;
mod handlers;
mod routes;

pub use dto::{ChatRequestDto, ChatResponseDto, ErrorResponse, MessageDto, StatsResponse, UserSessionDto};
pub use handlers::{
    assistant_chat, chat_stats, health, stream_chat, ChatAppState, DEFAULT_CHANNEL_CAPACITY,
    REQUEST_ID_HEADER,
};
pub use routes::{chat_router, chat_routes};
