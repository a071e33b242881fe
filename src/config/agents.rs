//! Static agent settings

use serde::Deserialize;
use std::collections::HashMap;

use super::error::ValidationError;
use crate::domain::agent::AgentSettings;
use crate::domain::foundation::AgentId;

/// Static per-agent settings, the fallback for every per-user lookup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentsConfig {
    /// Settings used for agents without their own entry
    #[serde(default)]
    pub default: AgentSettings,

    /// Settings keyed by logical agent id
    #[serde(default)]
    pub profiles: HashMap<String, AgentSettings>,
}

impl AgentsConfig {
    /// Static settings for an agent.
    pub fn settings_for(&self, agent_id: &AgentId) -> AgentSettings {
        self.profiles
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(agent_id.as_str()))
            .map(|(_, settings)| settings.clone())
            .unwrap_or_else(|| self.default.clone())
    }

    /// Validate agent settings
    pub fn validate(&self) -> Result<(), ValidationError> {
        let named = self.profiles.iter().map(|(k, v)| (k.as_str(), v));
        for (name, settings) in std::iter::once(("default", &self.default)).chain(named) {
            AgentId::new(name).map_err(|_| ValidationError::InvalidAgentId(name.to_string()))?;
            if settings.model.trim().is_empty() {
                return Err(ValidationError::MissingRequired("AGENTS__PROFILES__<AGENT>__MODEL"));
            }
            if let Some(t) = settings.temperature {
                if !(0.0..=2.0).contains(&t) {
                    return Err(ValidationError::InvalidTemperature(name.to_string()));
                }
            }
        }
        Ok(())
    }
}
