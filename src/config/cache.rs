//! Conversation cache configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::conversation::{
    HandlePolicy, DEFAULT_CLEANUP_INTERVAL, DEFAULT_HANDLE_TTL, DEFAULT_IDLE_EVICTION,
};

/// Which store backs the conversation cache
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

/// Conversation cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Redis connection URL, required for the redis backend
    pub redis_url: Option<String>,

    /// Key prefix for the redis backend
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    #[serde(default = "default_idle")]
    pub idle_secs: u64,

    #[serde(default = "default_cleanup")]
    pub cleanup_interval_secs: u64,
}

impl CacheConfig {
    pub fn policy(&self) -> HandlePolicy {
        HandlePolicy {
            ttl: Duration::from_secs(self.ttl_secs),
            idle_eviction: Duration::from_secs(self.idle_secs),
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Validate cache configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ttl_secs == 0 {
            return Err(ValidationError::InvalidCacheTiming("ttl must be positive"));
        }
        if self.idle_secs == 0 || self.idle_secs > self.ttl_secs {
            return Err(ValidationError::InvalidCacheTiming(
                "idle window must be positive and within the ttl",
            ));
        }
        if self.cleanup_interval_secs == 0 {
            return Err(ValidationError::InvalidCacheTiming(
                "cleanup interval must be positive",
            ));
        }
        if self.backend == CacheBackend::Redis {
            let url = self
                .redis_url
                .as_deref()
                .ok_or(ValidationError::MissingRequired("CACHE__REDIS_URL"))?;
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(ValidationError::InvalidRedisUrl);
            }
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: None,
            key_prefix: default_key_prefix(),
            ttl_secs: default_ttl(),
            idle_secs: default_idle(),
            cleanup_interval_secs: default_cleanup(),
        }
    }
}

fn default_key_prefix() -> String {
    "agent_gateway:conversation".to_string()
}

fn default_ttl() -> u64 {
    DEFAULT_HANDLE_TTL.as_secs()
}

fn default_idle() -> u64 {
    DEFAULT_IDLE_EVICTION.as_secs()
}

fn default_cleanup() -> u64 {
    DEFAULT_CLEANUP_INTERVAL.as_secs()
}
