//! In-memory conversation cache for single-process deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::conversation::{CacheKey, ConversationHandle, HandlePolicy};
use crate::domain::foundation::{AgentId, ThreadId, Timestamp};
use crate::ports::{CacheError, ConversationCache};

/// Conversation cache backed by a `HashMap` behind a tokio `RwLock`.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationCache {
    policy: HandlePolicy,
    entries: Arc<RwLock<HashMap<CacheKey, ConversationHandle>>>,
}

impl InMemoryConversationCache {
    pub fn new(policy: HandlePolicy) -> Self {
        Self {
            policy,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn policy(&self) -> &HandlePolicy {
        &self.policy
    }

    /// `get` against an explicit clock.
    pub async fn get_at(&self, key: &CacheKey, now: Timestamp) -> Option<ConversationHandle> {
        let mut entries = self.entries.write().await;
        let handle = entries.get_mut(key)?;
        if !handle.is_live(now) {
            return None;
        }
        handle.touch(now);
        Some(handle.clone())
    }

    /// `set` against an explicit clock.
    pub async fn set_at(
        &self,
        key: &CacheKey,
        remote_thread_id: ThreadId,
        agent_type: AgentId,
        now: Timestamp,
    ) -> ConversationHandle {
        let handle =
            ConversationHandle::new(key.clone(), remote_thread_id, agent_type, now, &self.policy);
        self.entries
            .write()
            .await
            .insert(key.clone(), handle.clone());
        handle
    }

    /// `cleanup` against an explicit clock.
    pub async fn cleanup_at(&self, now: Timestamp) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, handle| !handle.is_evictable(now, &self.policy));
        before - entries.len()
    }
}

#[async_trait]
impl ConversationCache for InMemoryConversationCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<ConversationHandle>, CacheError> {
        Ok(self.get_at(key, Timestamp::now()).await)
    }

    async fn set(
        &self,
        key: &CacheKey,
        remote_thread_id: ThreadId,
        agent_type: AgentId,
    ) -> Result<ConversationHandle, CacheError> {
        Ok(self
            .set_at(key, remote_thread_id, agent_type, Timestamp::now())
            .await)
    }

    async fn cleanup(&self) -> Result<usize, CacheError> {
        Ok(self.cleanup_at(Timestamp::now()).await)
    }

    async fn len(&self) -> Result<usize, CacheError> {
        Ok(self.entries.read().await.len())
    }
}
