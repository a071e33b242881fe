//! Mock chat stream provider for testing.
//!
//! Replays scripted SSE chunks so relay and handler tests run without a
//! real upstream. Chunks are emitted exactly as given, which lets tests
//! split `data:` lines across network reads.
//!
//! # Example
//!
//! ```ignore
//! let provider = MockChatProvider::new().with_tokens(&["Hel", "lo"]);
//! let stream = provider.open_stream(&creds, request).await?;
//! ```

use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::foundation::InstanceId;
use crate::ports::{
    ByteStream, ChatRequest, ChatStreamProvider, InstanceCredentials, ProviderError,
};

/// One scripted item of a mock stream.
#[derive(Debug, Clone)]
pub enum MockChunk {
    /// Raw bytes handed to the reader as one network chunk.
    Bytes(Vec<u8>),
    /// A transport failure mid-stream.
    Error(ProviderError),
}

/// Recorded `open_stream` call.
#[derive(Debug, Clone)]
pub struct RecordedChatCall {
    pub instance_id: InstanceId,
    pub request: ChatRequest,
}

#[derive(Debug, Clone)]
enum MockScript {
    Stream(Vec<MockChunk>),
    OpenError(ProviderError),
}

/// Scripted mock implementing `ChatStreamProvider`.
#[derive(Debug, Clone, Default)]
pub struct MockChatProvider {
    scripts: Arc<Mutex<VecDeque<MockScript>>>,
    chunk_delay: Duration,
    calls: Arc<Mutex<Vec<RecordedChatCall>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Encodes one content delta the way the upstream frames it.
pub fn sse_delta(content: &str) -> String {
    let payload = serde_json::json!({
        "choices": [{ "delta": { "content": content }, "finish_reason": null }]
    });
    format!("data: {}\n\n", payload)
}

pub const SSE_DONE: &str = "data: [DONE]\n\n";

impl MockChatProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a stream of raw chunks for the next call.
    pub fn with_chunks<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chunks = chunks
            .into_iter()
            .map(|c| MockChunk::Bytes(c.into().into_bytes()))
            .collect();
        self.with_script(chunks)
    }

    /// Queues a well-formed stream: one chunk per token, then `[DONE]`.
    pub fn with_tokens(self, tokens: &[&str]) -> Self {
        let mut chunks: Vec<String> = tokens.iter().map(|t| sse_delta(t)).collect();
        chunks.push(SSE_DONE.to_string());
        self.with_chunks(chunks)
    }

    /// Queues a fully custom script for the next call.
    pub fn with_script(self, chunks: Vec<MockChunk>) -> Self {
        lock(&self.scripts).push_back(MockScript::Stream(chunks));
        self
    }

    /// Makes the next call fail before any bytes flow.
    pub fn with_open_error(self, error: ProviderError) -> Self {
        lock(&self.scripts).push_back(MockScript::OpenError(error));
        self
    }

    /// Pause between chunks.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn calls(&self) -> Vec<RecordedChatCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl ChatStreamProvider for MockChatProvider {
    async fn open_stream(
        &self,
        credentials: &InstanceCredentials,
        request: ChatRequest,
    ) -> Result<ByteStream, ProviderError> {
        lock(&self.calls).push(RecordedChatCall {
            instance_id: credentials.instance_id.clone(),
            request,
        });

        let script = lock(&self.scripts)
            .pop_front()
            .unwrap_or_else(|| MockScript::Stream(vec![MockChunk::Bytes(SSE_DONE.into())]));

        let chunks = match script {
            MockScript::OpenError(error) => return Err(error),
            MockScript::Stream(chunks) => chunks,
        };

        let delay = self.chunk_delay;
        let stream = stream::unfold(chunks.into_iter(), move |mut chunks| async move {
            let next = chunks.next()?;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let item = match next {
                MockChunk::Bytes(bytes) => Ok(bytes),
                MockChunk::Error(error) => Err(error),
            };
            Some((item, chunks))
        });
        Ok(Box::pin(stream))
    }
}
