//! Redis-backed conversation cache for multi-process deployments.
//!
//! Handles are stored as JSON with a server-side expiry:
//! 1. `set` writes with `EX` equal to the idle window, so a handle nobody
//!    reuses disappears on its own
//! 2. every hit rewrites the handle with `EX` equal to the time left until
//!    `expires_at`
//!
//! Redis does the evicting, so `cleanup` has nothing to sweep.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::conversation::{CacheKey, ConversationHandle, HandlePolicy};
use crate::domain::foundation::{AgentId, ThreadId, Timestamp};
use crate::ports::{CacheError, ConversationCache};

#[derive(Clone)]
pub struct RedisConversationCache {
    conn: MultiplexedConnection,
    policy: HandlePolicy,
    prefix: String,
}

impl RedisConversationCache {
    pub fn new(conn: MultiplexedConnection, policy: HandlePolicy) -> Self {
        Self {
            conn,
            policy,
            prefix: "agent_gateway:conversation".to_string(),
        }
    }

    /// Connects to `url` and builds the cache.
    pub async fn connect(url: &str, policy: HandlePolicy) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        Ok(Self::new(conn, policy))
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn redis_key(&self, key: &CacheKey) -> String {
        format!("{}:{}", self.prefix, key)
    }

    async fn write(&self, handle: &ConversationHandle, ttl_secs: u64) -> Result<(), CacheError> {
        let json =
            serde_json::to_string(handle).map_err(|e| CacheError::Corrupt(e.to_string()))?;
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(self.redis_key(&handle.cache_key))
            .arg(json)
            .arg("EX")
            .arg(ttl_secs.max(1))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)
    }
}

/// `SCAN MATCH` glob for every handle under `prefix`.
fn key_pattern(prefix: &str) -> String {
    format!("{prefix}:*")
}

fn unavailable(e: redis::RedisError) -> CacheError {
    CacheError::Unavailable(e.to_string())
}

/// Seconds from `now` until the handle expires, at least one.
fn remaining_secs(handle: &ConversationHandle, now: Timestamp) -> u64 {
    handle.expires_at.duration_since(&now).num_seconds().max(1) as u64
}

#[async_trait]
impl ConversationCache for RedisConversationCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<ConversationHandle>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.redis_key(key)).await.map_err(unavailable)?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let mut handle: ConversationHandle =
            serde_json::from_str(&raw).map_err(|e| CacheError::Corrupt(e.to_string()))?;
        let now = Timestamp::now();
        if !handle.is_live(now) {
            return Ok(None);
        }

        handle.touch(now);
        self.write(&handle, remaining_secs(&handle, now)).await?;
        Ok(Some(handle))
    }

    async fn set(
        &self,
        key: &CacheKey,
        remote_thread_id: ThreadId,
        agent_type: AgentId,
    ) -> Result<ConversationHandle, CacheError> {
        let handle = ConversationHandle::new(
            key.clone(),
            remote_thread_id,
            agent_type,
            Timestamp::now(),
            &self.policy,
        );
        let idle = self.policy.idle_eviction.min(self.policy.ttl).as_secs();
        self.write(&handle, idle).await?;
        Ok(handle)
    }

    async fn cleanup(&self) -> Result<usize, CacheError> {
        Ok(0)
    }

    /// Counts keys with an incremental `SCAN`, so the server is never
    /// blocked walking the whole keyspace.
    async fn len(&self) -> Result<usize, CacheError> {
        let mut conn = self.conn.clone();
        let mut keys = conn
            .scan_match::<_, String>(key_pattern(&self.prefix))
            .await
            .map_err(unavailable)?;
        let mut count = 0;
        while keys.next_item().await.is_some() {
            count += 1;
        }
        Ok(count)
    }
}

impl std::fmt::Debug for RedisConversationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConversationCache")
            .field("prefix", &self.prefix)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    fn handle(now: Timestamp) -> ConversationHandle {
        ConversationHandle::new(
            CacheKey::new(&UserId::new("alice").unwrap(), &AgentId::new("research").unwrap()),
            ThreadId::new("thread_1").unwrap(),
            AgentId::new("research").unwrap(),
            now,
            &HandlePolicy::default(),
        )
    }

    #[test]
    fn remaining_secs_counts_down_to_expiry() {
        let t0 = Timestamp::from_unix_secs(1_700_000_000);
        let h = handle(t0);
        assert_eq!(remaining_secs(&h, t0), 7200);
        assert_eq!(remaining_secs(&h, t0.plus_secs(7000)), 200);
        assert_eq!(remaining_secs(&h, t0.plus_secs(9000)), 1);
    }

    #[test]
    fn scan_pattern_matches_handle_keys() {
        let h = handle(Timestamp::from_unix_secs(1_700_000_000));
        let pattern = key_pattern("gw_test");
        assert_eq!(pattern, "gw_test:*");
        let stored = format!("gw_test:{}", h.cache_key);
        assert!(stored.starts_with(pattern.trim_end_matches('*')));
    }

    #[test]
    fn handles_roundtrip_through_json() {
        let h = handle(Timestamp::from_unix_secs(1_700_000_000));
        let json = serde_json::to_string(&h).unwrap();
        let back: ConversationHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[tokio::test]
    #[ignore = "Requires a running Redis at REDIS_URL"]
    async fn integration_set_then_get() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        let cache = RedisConversationCache::connect(&url, HandlePolicy::default())
            .await
            .unwrap()
            .with_prefix("agent_gateway_test");
        let h = handle(Timestamp::now());

        cache
            .set(&h.cache_key, h.remote_thread_id.clone(), h.agent_type.clone())
            .await
            .unwrap();
        let hit = cache.get(&h.cache_key).await.unwrap().unwrap();
        assert_eq!(hit.use_count, 1);
    }

    #[tokio::test]
    #[ignore = "Requires a running Redis at REDIS_URL"]
    async fn integration_len_counts_prefixed_keys() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        let cache = RedisConversationCache::connect(&url, HandlePolicy::default())
            .await
            .unwrap()
            .with_prefix("agent_gateway_len_test");
        let h = handle(Timestamp::now());

        cache
            .set(&h.cache_key, h.remote_thread_id.clone(), h.agent_type.clone())
            .await
            .unwrap();
        assert_eq!(cache.len().await.unwrap(), 1);
    }
}
