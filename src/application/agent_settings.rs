//! Per-request agent settings resolution.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::agent::{AgentSettings, ConfigSource};
use crate::domain::foundation::{AgentId, UserId};
use crate::ports::AgentSettingsReader;

/// Resolves settings once per request.
///
/// A per-user override from the reader wins; anything else, including a
/// failed lookup, falls back to the static table.
#[derive(Clone, Default)]
pub struct AgentSettingsResolver {
    reader: Option<Arc<dyn AgentSettingsReader>>,
    statics: HashMap<AgentId, AgentSettings>,
    default: AgentSettings,
}

impl AgentSettingsResolver {
    pub fn new(default: AgentSettings) -> Self {
        Self {
            reader: None,
            statics: HashMap::new(),
            default,
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn AgentSettingsReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn with_static(mut self, agent_id: AgentId, settings: AgentSettings) -> Self {
        self.statics.insert(agent_id, settings);
        self
    }

    fn static_for(&self, agent_id: &AgentId) -> AgentSettings {
        self.statics
            .get(agent_id)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    pub async fn resolve(&self, user_id: &UserId, agent_id: &AgentId) -> ConfigSource {
        let Some(reader) = &self.reader else {
            return ConfigSource::Static(self.static_for(agent_id));
        };

        match reader.find_for_user(user_id, agent_id).await {
            Ok(Some(settings)) => ConfigSource::Dynamic(settings),
            Ok(None) => ConfigSource::Static(self.static_for(agent_id)),
            Err(e) => {
                tracing::warn!(
                    user = %user_id,
                    agent = %agent_id,
                    error = %e,
                    "agent settings lookup failed, using static settings"
                );
                ConfigSource::Static(self.static_for(agent_id))
            }
        }
    }
}

impl std::fmt::Debug for AgentSettingsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSettingsResolver")
            .field("has_reader", &self.reader.is_some())
            .field("statics", &self.statics.len())
            .finish()
    }
}
