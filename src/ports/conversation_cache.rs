//! Conversation cache port.
//!
//! Maps a (user, logical agent) key to the remote thread carrying that
//! conversation. The in-memory adapter serves a single process; the Redis
//! adapter lets several gateway processes share handles without changing
//! any call site.
//!
//! # Contract
//!
//! - `get` returns a handle only while it is live and records the hit
//!   (`last_used_at`, `use_count`). Expired entries are left for `cleanup`.
//! - `set` always overwrites; concurrent misses are last-write-wins.
//! - `cleanup` drops expired handles and handles never reused within the
//!   idle window, returning how many were removed.

use async_trait::async_trait;

use crate::domain::conversation::{CacheKey, ConversationHandle};
use crate::domain::foundation::{AgentId, ThreadId};

#[async_trait]
pub trait ConversationCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<ConversationHandle>, CacheError>;

    async fn set(
        &self,
        key: &CacheKey,
        remote_thread_id: ThreadId,
        agent_type: AgentId,
    ) -> Result<ConversationHandle, CacheError>;

    async fn cleanup(&self) -> Result<usize, CacheError>;

    /// Number of entries currently held (live or not yet swept).
    async fn len(&self) -> Result<usize, CacheError>;
}

/// Cache backend errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt cache entry: {0}")]
    Corrupt(String),
}
