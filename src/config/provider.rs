//! Upstream provider configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Upstream AI provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider API (no trailing slash)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default API key, used when an instance has no override
    pub api_key: Option<String>,

    /// Per-request timeout in seconds for non-streaming calls
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Value of the assistants beta header
    #[serde(default = "default_assistants_beta")]
    pub assistants_beta: String,
}

impl ProviderConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if a default key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// Validate provider configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl);
        }
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout(),
            assistants_beta: default_assistants_beta(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_assistants_beta() -> String {
    "assistants=v2".to_string()
}
