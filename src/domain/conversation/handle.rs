//! Conversation handle - a cached pointer to a remote thread.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::CacheKey;
use crate::domain::foundation::{AgentId, ThreadId, Timestamp};

/// Default lifetime of a cached handle.
pub const DEFAULT_HANDLE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Idle period after which a never-reused handle may be evicted.
pub const DEFAULT_IDLE_EVICTION: Duration = Duration::from_secs(30 * 60);

/// How often the background sweep runs.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Lifetime policy applied by every conversation cache backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlePolicy {
    /// Time from creation until the handle expires.
    pub ttl: Duration,
    /// Idle time after which an unused handle is evicted.
    pub idle_eviction: Duration,
}

impl Default for HandlePolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_HANDLE_TTL,
            idle_eviction: DEFAULT_IDLE_EVICTION,
        }
    }
}

/// A user's live conversation with one logical agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHandle {
    pub cache_key: CacheKey,
    pub remote_thread_id: ThreadId,
    pub created_at: Timestamp,
    pub last_used_at: Timestamp,
    pub expires_at: Timestamp,
    /// Number of cache hits since creation.
    pub use_count: u32,
    pub agent_type: AgentId,
}

impl ConversationHandle {
    /// Creates a fresh handle at `now` that expires after `policy.ttl`.
    pub fn new(
        cache_key: CacheKey,
        remote_thread_id: ThreadId,
        agent_type: AgentId,
        now: Timestamp,
        policy: &HandlePolicy,
    ) -> Self {
        Self {
            cache_key,
            remote_thread_id,
            created_at: now,
            last_used_at: now,
            expires_at: now.plus(policy.ttl),
            use_count: 0,
            agent_type,
        }
    }

    /// A handle is live strictly before its expiry instant.
    pub fn is_live(&self, now: Timestamp) -> bool {
        now.is_before(&self.expires_at)
    }

    /// Records a cache hit.
    pub fn touch(&mut self, now: Timestamp) {
        self.last_used_at = now;
        self.use_count = self.use_count.saturating_add(1);
    }

    /// Whether the periodic sweep should drop this handle.
    ///
    /// Expired handles go, and so do handles nobody came back for within the
    /// idle window.
    pub fn is_evictable(&self, now: Timestamp, policy: &HandlePolicy) -> bool {
        if now.is_after(&self.expires_at) {
            return true;
        }
        self.use_count == 0 && now.is_after(&self.last_used_at.plus(policy.idle_eviction))
    }
}
