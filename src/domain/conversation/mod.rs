//! Conversation module - cached handles to remote conversation threads.

mod cache_key;
mod handle;

pub use cache_key::CacheKey;
pub use handle::{
    ConversationHandle, HandlePolicy, DEFAULT_CLEANUP_INTERVAL, DEFAULT_HANDLE_TTL,
    DEFAULT_IDLE_EVICTION,
};
