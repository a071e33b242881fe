//! Per-user agent settings lookup.

use async_trait::async_trait;

use crate::domain::agent::AgentSettings;
use crate::domain::foundation::{AgentId, UserId};

/// Reads per-user overrides of an agent's settings.
///
/// `Ok(None)` means the user has no override. Callers treat errors the same
/// way and fall back to the static configuration.
#[async_trait]
pub trait AgentSettingsReader: Send + Sync {
    async fn find_for_user(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
    ) -> Result<Option<AgentSettings>, SettingsLookupError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("settings lookup failed: {0}")]
pub struct SettingsLookupError(pub String);
