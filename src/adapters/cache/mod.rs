//! Conversation cache adapters.
//!
//! - `InMemoryConversationCache` - process-local map, swept by the janitor
//! - `RedisConversationCache` - shared store with server-side expiry

mod in_memory;
mod redis;

pub use self::redis::RedisConversationCache;
pub use in_memory::InMemoryConversationCache;
