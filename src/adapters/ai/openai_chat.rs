//! OpenAI chat completions adapter for the native streaming transport.
//!
//! Posts a `stream: true` completion and hands the raw SSE body back to the
//! caller. Decoding lives in the stream relay.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::openai_config::{build_client, check_status, OpenAIConfig};
use crate::ports::{
    ByteStream, ChatMessage, ChatRequest, ChatStreamProvider, InstanceCredentials, ProviderError,
};

/// OpenAI-compatible streaming chat provider.
pub struct OpenAIChatProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIChatProvider {
    /// Streams stay open as long as tokens flow, so only the connect is bounded.
    pub fn new(config: OpenAIConfig) -> Result<Self, ProviderError> {
        let client = build_client(
            Client::builder()
                .connect_timeout(config.timeout.min(Duration::from_secs(10)))
                .pool_idle_timeout(Duration::from_secs(90)),
        )?;
        Ok(Self { config, client })
    }

    fn to_openai_request(request: ChatRequest) -> CompletionBody {
        CompletionBody {
            model: request.model,
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: true,
        }
    }
}

#[async_trait]
impl ChatStreamProvider for OpenAIChatProvider {
    async fn open_stream(
        &self,
        credentials: &InstanceCredentials,
        request: ChatRequest,
    ) -> Result<ByteStream, ProviderError> {
        let body = Self::to_openai_request(request);
        tracing::debug!(
            instance = %credentials.instance_id,
            model = %body.model,
            messages = body.messages.len(),
            "opening chat completion stream"
        );

        let builder = self
            .client
            .post(self.config.url("chat/completions"))
            .header("Accept", "text/event-stream")
            .json(&body);
        let response = self
            .config
            .authorize(builder, credentials)?
            .send()
            .await
            .map_err(ProviderError::from)?;
        let response = check_status(response).await?;

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| ProviderError::network(format!("stream error: {}", e)))
        });
        Ok(Box::pin(stream))
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}
