//! Native token-stream transport port.
//!
//! The provider returns the raw SSE byte stream of a chat completion; the
//! stream relay owns decoding so that malformed chunks can be skipped
//! without the adapter having to know about the client protocol.

use async_trait::async_trait;
use futures::Stream;
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use super::ProviderError;
use crate::domain::foundation::InstanceId;

/// Raw bytes of an upstream SSE response, chunked as they arrive.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ProviderError>> + Send>>;

/// Port for providers that stream token deltas directly.
#[async_trait]
pub trait ChatStreamProvider: Send + Sync {
    /// Open a streaming chat completion against one backend instance.
    ///
    /// Fails before any bytes flow if the upstream rejects the request.
    async fn open_stream(
        &self,
        credentials: &InstanceCredentials,
        request: ChatRequest,
    ) -> Result<ByteStream, ProviderError>;
}

/// Which backend instance to talk to and with which key.
#[derive(Debug)]
pub struct InstanceCredentials {
    pub instance_id: InstanceId,
    /// Per-instance key; adapters fall back to their default key when absent.
    pub api_key: Option<Secret<String>>,
}

impl InstanceCredentials {
    pub fn new(instance_id: InstanceId) -> Self {
        Self {
            instance_id,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(api_key.into()));
        self
    }
}

/// Role of a chat message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A message in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// A streaming chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}
