//! Native token-stream relay.

use futures::StreamExt;

use super::{parse_delta, EventSink, SseLine, SseLineDecoder};
use crate::application::error::GatewayError;
use crate::domain::stream::{StreamClock, StreamEvent, StreamMetrics};
use crate::ports::ByteStream;

/// Fully relayed native stream.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeReply {
    pub content: String,
    pub metrics: StreamMetrics,
}

/// Reads the upstream byte stream to completion, emitting one `token`
/// event per content delta with the cumulative content so far.
///
/// Ends at `[DONE]` or end of stream. The terminal event is left to the
/// caller. Stops at the next chunk boundary once the request is cancelled,
/// dropping the upstream connection.
pub async fn relay_native_stream(
    mut stream: ByteStream,
    sink: &mut EventSink,
    mut clock: StreamClock,
) -> Result<NativeReply, GatewayError> {
    let cancel = sink.cancellation();
    let mut decoder = SseLineDecoder::new();
    let mut content = String::new();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
            next = stream.next() => next,
        };

        let (lines, at_end) = match next {
            Some(Ok(bytes)) => (decoder.push(&bytes), false),
            Some(Err(e)) => {
                tracing::warn!(error = %e, relayed_bytes = content.len(), "chat stream interrupted");
                return Err(GatewayError::upstream("Chat stream interrupted", e));
            }
            None => (decoder.finish().into_iter().collect(), true),
        };

        let mut done = false;
        for line in lines {
            let data = match line {
                SseLine::Done => {
                    done = true;
                    break;
                }
                SseLine::Data(data) => data,
            };
            let delta = match parse_delta(&data) {
                Ok(Some(delta)) => delta,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(error = %e, line = %data, "skipping malformed stream chunk");
                    continue;
                }
            };

            clock.record_token();
            content.push_str(&delta);
            let event = StreamEvent::Token {
                delta,
                content: content.clone(),
            };
            if !sink.emit(event).await {
                return Err(GatewayError::Cancelled);
            }
        }

        if done || at_end {
            return Ok(NativeReply {
                content,
                metrics: clock.finish(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{sse_delta, MockChatProvider, MockChunk, SSE_DONE};
    use crate::domain::foundation::InstanceId;
    use crate::ports::{ChatMessage, ChatRequest, ChatStreamProvider, InstanceCredentials, ProviderError};
    use tokio::sync::mpsc;

    async fn open(provider: &MockChatProvider) -> ByteStream {
        let creds = InstanceCredentials::new(InstanceId::new("default").unwrap());
        let request = ChatRequest::new("gpt-4o-mini", vec![ChatMessage::user("hi")]);
        provider.open_stream(&creds, request).await.unwrap()
    }

    fn drain(rx: &mut mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn tokens_carry_cumulative_content() {
        let provider = MockChatProvider::new().with_tokens(&["Hel", "lo", " world"]);
        let (mut sink, mut rx) = EventSink::channel(16);

        let reply = relay_native_stream(open(&provider).await, &mut sink, StreamClock::start())
            .await
            .unwrap();

        assert_eq!(reply.content, "Hello world");
        assert_eq!(reply.metrics.token_count, 3);
        let events = drain(&mut rx);
        let cumulative: Vec<_> = events
            .iter()
            .map(|e| match e {
                StreamEvent::Token { content, .. } => content.as_str(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(cumulative, vec!["Hel", "Hello", "Hello world"]);
    }

    #[tokio::test]
    async fn lines_split_across_chunks_are_reassembled() {
        let framed = format!("{}{}{}", sse_delta("Hi"), sse_delta(" there"), SSE_DONE);
        let (a, b) = framed.split_at(17);
        let (b, c) = b.split_at(40);
        let provider = MockChatProvider::new().with_chunks(vec![a, b, c]);
        let (mut sink, _rx) = EventSink::channel(16);

        let reply = relay_native_stream(open(&provider).await, &mut sink, StreamClock::start())
            .await
            .unwrap();
        assert_eq!(reply.content, "Hi there");
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let provider = MockChatProvider::new().with_chunks(vec![
            sse_delta("a"),
            "data: {broken\n\n".to_string(),
            sse_delta("b"),
            SSE_DONE.to_string(),
        ]);
        let (mut sink, _rx) = EventSink::channel(16);

        let reply = relay_native_stream(open(&provider).await, &mut sink, StreamClock::start())
            .await
            .unwrap();
        assert_eq!(reply.content, "ab");
    }

    #[tokio::test]
    async fn end_of_stream_without_done_completes() {
        let provider = MockChatProvider::new().with_chunks(vec![sse_delta("only")]);
        let (mut sink, _rx) = EventSink::channel(16);

        let reply = relay_native_stream(open(&provider).await, &mut sink, StreamClock::start())
            .await
            .unwrap();
        assert_eq!(reply.content, "only");
    }

    #[tokio::test]
    async fn content_after_done_is_ignored() {
        let provider = MockChatProvider::new().with_chunks(vec![
            format!("{}{}{}", sse_delta("kept"), SSE_DONE, sse_delta("dropped")),
        ]);
        let (mut sink, _rx) = EventSink::channel(16);

        let reply = relay_native_stream(open(&provider).await, &mut sink, StreamClock::start())
            .await
            .unwrap();
        assert_eq!(reply.content, "kept");
    }

    #[tokio::test]
    async fn transport_error_mid_stream_is_upstream_error() {
        let provider = MockChatProvider::new().with_script(vec![
            MockChunk::Bytes(sse_delta("partial").into_bytes()),
            MockChunk::Error(ProviderError::network("connection reset")),
        ]);
        let (mut sink, mut rx) = EventSink::channel(16);

        let err = relay_native_stream(open(&provider).await, &mut sink, StreamClock::start())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Upstream { .. }));
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn empty_stream_has_no_first_token_latency() {
        let provider = MockChatProvider::new().with_tokens(&[]);
        let (mut sink, _rx) = EventSink::channel(16);

        let reply = relay_native_stream(open(&provider).await, &mut sink, StreamClock::start())
            .await
            .unwrap();
        assert_eq!(reply.content, "");
        assert_eq!(reply.metrics.first_token_latency_ms, None);
    }

    #[tokio::test]
    async fn disconnect_stops_the_relay() {
        let provider = MockChatProvider::new()
            .with_tokens(&["a", "b", "c"])
            .with_chunk_delay(std::time::Duration::from_millis(20));
        let (mut sink, rx) = EventSink::channel(16);
        drop(rx);

        let err = relay_native_stream(open(&provider).await, &mut sink, StreamClock::start())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Cancelled));
    }
}
