//! In-memory per-user agent settings.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::agent::AgentSettings;
use crate::domain::foundation::{AgentId, UserId};
use crate::ports::{AgentSettingsReader, SettingsLookupError};

/// Per-user overrides held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgentSettings {
    overrides: Arc<RwLock<HashMap<(UserId, AgentId), AgentSettings>>>,
    fail_with: Arc<RwLock<Option<String>>>,
}

impl InMemoryAgentSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user_id: UserId, agent_id: AgentId, settings: AgentSettings) {
        self.overrides
            .write()
            .await
            .insert((user_id, agent_id), settings);
    }

    /// Makes every lookup fail, for exercising the static fallback.
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.write().await = Some(message.into());
    }
}

#[async_trait]
impl AgentSettingsReader for InMemoryAgentSettings {
    async fn find_for_user(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
    ) -> Result<Option<AgentSettings>, SettingsLookupError> {
        if let Some(message) = self.fail_with.read().await.clone() {
            return Err(SettingsLookupError(message));
        }
        Ok(self
            .overrides
            .read()
            .await
            .get(&(user_id.clone(), agent_id.clone()))
            .cloned())
    }
}
