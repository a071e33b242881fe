//! Native token-stream chat turn.

use std::sync::Arc;

use tracing::Instrument;

use super::command::{emit_terminal, ChatCommand, ChatReply};
use crate::application::agent_settings::AgentSettingsResolver;
use crate::application::counters::PerformanceCounters;
use crate::application::error::GatewayError;
use crate::application::health_router::HealthRouter;
use crate::application::relay::{relay_native_stream, EventSink};
use crate::domain::agent::AgentSettings;
use crate::domain::stream::{StreamClock, StreamEvent};
use crate::ports::{ChatMessage, ChatRequest, ChatRole, ChatStreamProvider};

/// Relays the provider's native token stream to the client.
pub struct StreamChatHandler {
    provider: Arc<dyn ChatStreamProvider>,
    router: Arc<HealthRouter>,
    settings: Arc<AgentSettingsResolver>,
    counters: Arc<PerformanceCounters>,
}

impl StreamChatHandler {
    pub fn new(
        provider: Arc<dyn ChatStreamProvider>,
        router: Arc<HealthRouter>,
        settings: Arc<AgentSettingsResolver>,
        counters: Arc<PerformanceCounters>,
    ) -> Self {
        Self {
            provider,
            router,
            settings,
            counters,
        }
    }

    /// Runs one turn, emitting `start`, `token`* and one terminal event.
    pub async fn handle(
        &self,
        cmd: ChatCommand,
        mut sink: EventSink,
    ) -> Result<ChatReply, GatewayError> {
        let span = tracing::info_span!(
            "stream_chat",
            request_id = %cmd.request_id,
            user = %cmd.user.id,
            agent = %cmd.agent,
        );

        async move {
            self.counters.increment_requests();
            let clock = StreamClock::start();

            let result = match cmd.validate() {
                Ok(()) => {
                    sink.emit(StreamEvent::Start).await;
                    self.relay(&cmd, &mut sink, clock.clone()).await
                }
                Err(e) => Err(e),
            };

            emit_terminal(&mut sink, &result, clock.elapsed_ms()).await;
            result
        }
        .instrument(span)
        .await
    }

    async fn relay(
        &self,
        cmd: &ChatCommand,
        sink: &mut EventSink,
        clock: StreamClock,
    ) -> Result<ChatReply, GatewayError> {
        let source = self.settings.resolve(&cmd.user.id, &cmd.agent).await;
        let instance = self.router.resolve_instance(&cmd.agent).await;
        let credentials = self.router.credentials_for(&instance);
        tracing::debug!(instance = %instance, settings = source.label(), "opening chat stream");

        let request = build_request(source.settings(), &cmd.messages);
        let stream = match self.provider.open_stream(&credentials, request).await {
            Ok(stream) => stream,
            Err(e) => {
                if e.counts_against_instance() {
                    self.router.record_failure(&instance).await;
                }
                return Err(GatewayError::upstream("Failed to open chat stream", e));
            }
        };

        match relay_native_stream(stream, sink, clock).await {
            Ok(reply) => {
                let total_ms = reply.metrics.total_time_ms;
                self.router.record_success(&instance, total_ms).await;
                self.counters.record_successful_stream(total_ms);
                tracing::info!(
                    total_ms,
                    tokens = reply.metrics.token_count,
                    first_token_ms = ?reply.metrics.first_token_latency_ms,
                    "chat stream complete"
                );
                Ok(ChatReply {
                    content: reply.content,
                    thread_id: None,
                    metrics: Some(reply.metrics),
                })
            }
            Err(GatewayError::Cancelled) => Err(GatewayError::Cancelled),
            Err(e) => {
                self.router.record_failure(&instance).await;
                Err(e)
            }
        }
    }
}

/// Prepends the agent's system prompt unless the client already sent one.
fn build_request(settings: &AgentSettings, history: &[ChatMessage]) -> ChatRequest {
    let has_system = history.iter().any(|m| m.role == ChatRole::System);
    let mut messages = Vec::with_capacity(history.len() + 1);
    if let Some(prompt) = settings.system_prompt.as_deref().filter(|_| !has_system) {
        messages.push(ChatMessage::system(prompt));
    }
    messages.extend_from_slice(history);

    ChatRequest::new(settings.model.clone(), messages)
        .with_temperature(settings.temperature)
        .with_max_tokens(settings.max_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockChatProvider, MockChunk, sse_delta};
    use crate::domain::foundation::{AgentId, AuthenticatedUser, InstanceId, UserId};
    use crate::domain::routing::BackendRoute;
    use crate::ports::ProviderError;
    use tokio::sync::mpsc;

    struct Fixture {
        provider: MockChatProvider,
        router: Arc<HealthRouter>,
        counters: Arc<PerformanceCounters>,
        handler: StreamChatHandler,
    }

    fn fixture(provider: MockChatProvider) -> Fixture {
        let router = Arc::new(HealthRouter::new(
            vec![BackendRoute {
                logical_agent_id: AgentId::new("research").unwrap(),
                primary_instance_id: InstanceId::new("primary").unwrap(),
                fallback_instance_id: InstanceId::new("default").unwrap(),
            }],
            InstanceId::new("default").unwrap(),
        ));
        let counters = Arc::new(PerformanceCounters::new());
        let settings = AgentSettingsResolver::new(AgentSettings {
            system_prompt: Some("You are helpful.".to_string()),
            ..AgentSettings::default()
        });
        let handler = StreamChatHandler::new(
            Arc::new(provider.clone()),
            router.clone(),
            Arc::new(settings),
            counters.clone(),
        );
        Fixture {
            provider,
            router,
            counters,
            handler,
        }
    }

    fn command() -> ChatCommand {
        ChatCommand::new(
            AuthenticatedUser::new(UserId::new("user-1").unwrap(), None, None),
            AgentId::new("research").unwrap(),
            vec![ChatMessage::user("Hello?")],
        )
    }

    fn collect(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn emits_start_tokens_and_complete() {
        let f = fixture(MockChatProvider::new().with_tokens(&["Hi", "!"]));
        let (sink, rx) = EventSink::channel(32);

        let reply = f.handler.handle(command(), sink).await.unwrap();
        assert_eq!(reply.content, "Hi!");

        let names: Vec<_> = collect(rx).iter().map(StreamEvent::name).collect();
        assert_eq!(names, vec!["start", "token", "token", "complete"]);
        assert_eq!(f.counters.stats().successful_streams, 1);
    }

    #[tokio::test]
    async fn system_prompt_is_prepended() {
        let f = fixture(MockChatProvider::new().with_tokens(&["ok"]));
        let (sink, _rx) = EventSink::channel(32);
        f.handler.handle(command(), sink).await.unwrap();

        let call = &f.provider.calls()[0];
        assert_eq!(call.instance_id.as_str(), "primary");
        assert_eq!(call.request.messages[0], ChatMessage::system("You are helpful."));
        assert_eq!(call.request.messages.len(), 2);
    }

    #[tokio::test]
    async fn open_failure_is_single_error_and_charges_instance() {
        let f = fixture(MockChatProvider::new().with_open_error(ProviderError::unavailable("503")));
        let (sink, rx) = EventSink::channel(32);

        let err = f.handler.handle(command(), sink).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream { .. }));

        let events = collect(rx);
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(events.last().map(StreamEvent::name), Some("error"));
        let primary = InstanceId::new("primary").unwrap();
        assert_eq!(f.router.health_of(&primary).await.failure_count, 1);
        assert_eq!(f.counters.stats().successful_streams, 0);
    }

    #[tokio::test]
    async fn rejected_request_leaves_instance_healthy() {
        let f = fixture(MockChatProvider::new().with_open_error(ProviderError::from_status(
            400,
            "maximum context length exceeded",
        )));
        let (sink, _rx) = EventSink::channel(32);

        let err = f.handler.handle(command(), sink).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream { .. }));
        let primary = InstanceId::new("primary").unwrap();
        assert_eq!(f.router.health_of(&primary).await.failure_count, 0);
    }

    #[tokio::test]
    async fn mid_stream_failure_ends_with_error() {
        let f = fixture(MockChatProvider::new().with_script(vec![
            MockChunk::Bytes(sse_delta("par").into_bytes()),
            MockChunk::Error(ProviderError::network("reset")),
        ]));
        let (sink, rx) = EventSink::channel(32);

        assert!(f.handler.handle(command(), sink).await.is_err());
        let names: Vec<_> = collect(rx).iter().map(StreamEvent::name).collect();
        assert_eq!(names, vec!["start", "token", "error"]);
    }

    #[tokio::test]
    async fn invalid_command_never_reaches_provider() {
        let f = fixture(MockChatProvider::new());
        let (sink, rx) = EventSink::channel(32);
        let cmd = ChatCommand::new(
            AuthenticatedUser::new(UserId::new("user-1").unwrap(), None, None),
            AgentId::new("research").unwrap(),
            vec![],
        );

        let err = f.handler.handle(cmd, sink).await.unwrap_err();
        assert!(matches!(err, GatewayError::BadRequest(_)));
        assert_eq!(f.provider.call_count(), 0);
        let names: Vec<_> = collect(rx).iter().map(StreamEvent::name).collect();
        assert_eq!(names, vec!["error"]);
    }

    #[test]
    fn client_system_message_is_kept_as_is() {
        let settings = AgentSettings {
            system_prompt: Some("configured".to_string()),
            temperature: Some(0.3),
            ..AgentSettings::default()
        };
        let history = vec![ChatMessage::system("client"), ChatMessage::user("q")];
        let request = build_request(&settings, &history);
        assert_eq!(request.messages, history);
        assert_eq!(request.temperature, Some(0.3));
    }
}
