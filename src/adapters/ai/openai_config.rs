//! Shared configuration and plumbing for the OpenAI-compatible adapters.

use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

use crate::ports::{InstanceCredentials, ProviderError};

/// Configuration for the OpenAI-compatible provider adapters.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Default API key, used when an instance carries no override.
    api_key: Option<Secret<String>>,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// Timeout for request/response calls. Streams only bound the connect.
    pub timeout: Duration,
    /// Value sent in the `OpenAI-Beta` header on assistants calls.
    pub assistants_beta: String,
}

impl OpenAIConfig {
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(30),
            assistants_beta: "assistants=v2".to_string(),
        }
    }

    /// Sets the default API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(api_key.into()));
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_assistants_beta(mut self, value: impl Into<String>) -> Self {
        self.assistants_beta = value.into();
        self
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Picks the instance key, falling back to the default key.
    pub(super) fn authorize(
        &self,
        builder: RequestBuilder,
        credentials: &InstanceCredentials,
    ) -> Result<RequestBuilder, ProviderError> {
        let key = credentials
            .api_key
            .as_ref()
            .or(self.api_key.as_ref())
            .ok_or(ProviderError::AuthenticationFailed)?;
        Ok(builder.bearer_auth(key.expose_secret()))
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub(super) fn build_client(builder: reqwest::ClientBuilder) -> Result<Client, ProviderError> {
    builder
        .build()
        .map_err(|e| ProviderError::unavailable(format!("failed to build HTTP client: {}", e)))
}

/// Passes through 2xx responses and maps everything else to an error.
pub(super) async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::from_status(status.as_u16(), body))
}
