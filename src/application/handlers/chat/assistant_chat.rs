//! Run-based chat turn: thread, message, run, poll.

use std::sync::Arc;

use tracing::Instrument;

use super::command::{emit_terminal, ChatCommand, ChatReply};
use crate::application::agent_settings::AgentSettingsResolver;
use crate::application::counters::PerformanceCounters;
use crate::application::error::GatewayError;
use crate::application::health_router::HealthRouter;
use crate::application::relay::{settle_poll_outcome, EventSink};
use crate::application::run_poller::RunPoller;
use crate::domain::conversation::CacheKey;
use crate::domain::foundation::{InstanceId, ThreadId};
use crate::domain::stream::{StreamClock, StreamEvent, THINKING_STATUS};
use crate::ports::{AssistantRunsProvider, ConversationCache, InstanceCredentials, ProviderError};

/// Drives an asynchronous assistant run and relays its result.
pub struct AssistantChatHandler {
    provider: Arc<dyn AssistantRunsProvider>,
    cache: Arc<dyn ConversationCache>,
    router: Arc<HealthRouter>,
    settings: Arc<AgentSettingsResolver>,
    counters: Arc<PerformanceCounters>,
    poller: RunPoller,
}

impl AssistantChatHandler {
    pub fn new(
        provider: Arc<dyn AssistantRunsProvider>,
        cache: Arc<dyn ConversationCache>,
        router: Arc<HealthRouter>,
        settings: Arc<AgentSettingsResolver>,
        counters: Arc<PerformanceCounters>,
    ) -> Self {
        let poller = RunPoller::new(provider.clone());
        Self {
            provider,
            cache,
            router,
            settings,
            counters,
            poller,
        }
    }

    /// Runs one turn, emitting `start`, `status("thinking")` and one
    /// terminal event carrying the thread id on success.
    pub async fn handle(
        &self,
        cmd: ChatCommand,
        mut sink: EventSink,
    ) -> Result<ChatReply, GatewayError> {
        let span = tracing::info_span!(
            "assistant_chat",
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
                    sink.emit(StreamEvent::status(THINKING_STATUS)).await;
                    self.run_turn(&cmd, &sink).await
                }
                Err(e) => Err(e),
            };

            if result.is_ok() {
                self.counters.record_successful_stream(clock.elapsed_ms());
            }
            emit_terminal(&mut sink, &result, clock.elapsed_ms()).await;
            result
        }
        .instrument(span)
        .await
    }

    async fn run_turn(
        &self,
        cmd: &ChatCommand,
        sink: &EventSink,
    ) -> Result<ChatReply, GatewayError> {
        let source = self.settings.resolve(&cmd.user.id, &cmd.agent).await;
        let instance = self.router.resolve_instance(&cmd.agent).await;
        let credentials = self.router.credentials_for(&instance);
        let key = CacheKey::new(&cmd.user.id, &cmd.agent);

        let (thread_id, origin) = self
            .conversation_thread(&key, cmd, &instance, &credentials)
            .await?;

        let content = cmd.last_user_message().unwrap_or_default();
        let added = self
            .provider
            .add_message(&credentials, &thread_id, content)
            .await;
        let (thread_id, origin) = match added {
            Ok(()) => (thread_id, origin),
            Err(ProviderError::NotFound(detail)) if origin != ThreadOrigin::Created => {
                tracing::warn!(
                    thread = %thread_id,
                    origin = origin.label(),
                    detail = %detail,
                    "conversation thread unknown upstream, starting a new one"
                );
                let fresh = self.create_thread(&instance, &credentials).await?;
                if let Err(e) = self.provider.add_message(&credentials, &fresh, content).await {
                    return Err(self
                        .upstream_failure(&instance, "Failed to add message to thread", e)
                        .await);
                }
                (fresh, ThreadOrigin::Created)
            }
            Err(e) => {
                return Err(self
                    .upstream_failure(&instance, "Failed to add message to thread", e)
                    .await)
            }
        };

        // Only threads the backend has accepted a message on are remembered.
        if origin != ThreadOrigin::Cached {
            if let Err(e) = self
                .cache
                .set(&key, thread_id.clone(), cmd.agent.clone())
                .await
            {
                tracing::warn!(error = %e, "failed to cache conversation thread");
            }
        }

        // Per-user overrides travel as run instructions; static settings
        // are already baked into the assistant.
        let instructions = source
            .is_dynamic()
            .then(|| source.settings().system_prompt.as_deref())
            .flatten();
        let (run_id, status) = match self
            .provider
            .create_run(&credentials, &thread_id, instructions)
            .await
        {
            Ok(run) => run,
            Err(e) => {
                return Err(self
                    .upstream_failure(&instance, "Failed to start assistant run", e)
                    .await)
            }
        };

        let budget = self.router.optimized_poll_budget(&instance).await;
        tracing::debug!(
            instance = %instance,
            thread = %thread_id,
            run = %run_id,
            max_attempts = budget.max_attempts,
            mode = ?cmd.mode,
            settings = source.label(),
            "polling assistant run"
        );

        let outcome = self
            .poller
            .poll_for_completion(
                &credentials,
                &thread_id,
                &run_id,
                status,
                budget,
                cmd.mode,
                &sink.cancellation(),
            )
            .await;

        if outcome.is_completed() {
            self.router
                .record_success(&instance, outcome.elapsed_ms())
                .await;
        } else if outcome.status.counts_against_instance() {
            self.router.record_failure(&instance).await;
        }
        tracing::info!(
            status = %outcome.status,
            attempts = outcome.attempts,
            elapsed_ms = outcome.elapsed_ms(),
            "assistant run settled"
        );

        let content = settle_poll_outcome(outcome)?;
        Ok(ChatReply {
            content,
            thread_id: Some(thread_id),
            metrics: None,
        })
    }

    /// Cached thread, else the client's session thread, else a new one.
    ///
    /// Cache failures degrade to a miss. Two concurrent misses for the same
    /// key may each create a thread; the later `set` wins.
    async fn conversation_thread(
        &self,
        key: &CacheKey,
        cmd: &ChatCommand,
        instance: &InstanceId,
        credentials: &InstanceCredentials,
    ) -> Result<(ThreadId, ThreadOrigin), GatewayError> {
        match self.cache.get(key).await {
            Ok(Some(handle)) => {
                tracing::debug!(thread = %handle.remote_thread_id, uses = handle.use_count, "conversation cache hit");
                return Ok((handle.remote_thread_id, ThreadOrigin::Cached));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "conversation cache read failed, treating as miss"),
        }

        match &cmd.session_thread {
            Some(thread) => {
                tracing::debug!(thread = %thread, "resuming client session thread");
                Ok((thread.clone(), ThreadOrigin::Session))
            }
            None => {
                let thread = self.create_thread(instance, credentials).await?;
                Ok((thread, ThreadOrigin::Created))
            }
        }
    }

    async fn create_thread(
        &self,
        instance: &InstanceId,
        credentials: &InstanceCredentials,
    ) -> Result<ThreadId, GatewayError> {
        match self.provider.create_thread(credentials).await {
            Ok(thread) => Ok(thread),
            Err(e) => Err(self
                .upstream_failure(instance, "Failed to create conversation thread", e)
                .await),
        }
    }

    /// Charges the instance only when the backend itself is at fault.
    async fn upstream_failure(
        &self,
        instance: &InstanceId,
        context: &'static str,
        error: ProviderError,
    ) -> GatewayError {
        if error.counts_against_instance() {
            self.router.record_failure(instance).await;
        } else {
            tracing::debug!(instance = %instance, error = %error, "request rejected upstream, instance health unchanged");
        }
        GatewayError::upstream(context, error)
    }
}

/// Where the turn's thread came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThreadOrigin {
    Cached,
    Session,
    Created,
}

impl ThreadOrigin {
    fn label(self) -> &'static str {
        match self {
            ThreadOrigin::Cached => "cache",
            ThreadOrigin::Session => "session",
            ThreadOrigin::Created => "created",
        }
    }
}
