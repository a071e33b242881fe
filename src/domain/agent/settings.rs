//! Per-agent generation settings and where they came from.

use serde::{Deserialize, Serialize};

/// Generation settings for one logical agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Chat model used by the native-stream transport.
    pub model: String,
    /// Instructions prepended as a system message, or passed to the run.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            system_prompt: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Settings resolved for one request.
///
/// `Dynamic` comes from a per-user override store; `Static` is the
/// configured default and the fallback whenever the lookup fails.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    Dynamic(AgentSettings),
    Static(AgentSettings),
}

impl ConfigSource {
    pub fn settings(&self) -> &AgentSettings {
        match self {
            ConfigSource::Dynamic(settings) | ConfigSource::Static(settings) => settings,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, ConfigSource::Dynamic(_))
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            ConfigSource::Dynamic(_) => "dynamic",
            ConfigSource::Static(_) => "static",
        }
    }
}
