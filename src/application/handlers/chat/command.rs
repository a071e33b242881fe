//! Chat command, reply, and the terminal-event boundary shared by both
//! transports.

use crate::application::error::GatewayError;
use crate::application::relay::EventSink;
use crate::domain::foundation::{AgentId, AuthenticatedUser, RequestId, ThreadId};
use crate::domain::run::PollMode;
use crate::domain::stream::{StreamEvent, StreamMetrics};
use crate::ports::{ChatMessage, ChatRole};

/// One chat turn from an authenticated user.
#[derive(Debug, Clone)]
pub struct ChatCommand {
    pub request_id: RequestId,
    pub user: AuthenticatedUser,
    /// Logical agent the client selected.
    pub agent: AgentId,
    /// Full message history as the client holds it.
    pub messages: Vec<ChatMessage>,
    /// Thread id the client cached from an earlier `complete` event.
    pub session_thread: Option<ThreadId>,
    pub mode: PollMode,
}

impl ChatCommand {
    pub fn new(user: AuthenticatedUser, agent: AgentId, messages: Vec<ChatMessage>) -> Self {
        Self {
            request_id: RequestId::new(),
            user,
            agent,
            messages,
            session_thread: None,
            mode: PollMode::Interactive,
        }
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_session_thread(mut self, thread: Option<ThreadId>) -> Self {
        self.session_thread = thread;
        self
    }

    pub fn with_mode(mut self, mode: PollMode) -> Self {
        self.mode = mode;
        self
    }

    /// The newest user message, the one this turn answers.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        match self.last_user_message() {
            Some(content) if !content.trim().is_empty() => Ok(()),
            Some(_) => Err(GatewayError::BadRequest(
                "The last user message is empty".to_string(),
            )),
            None => Err(GatewayError::BadRequest(
                "At least one user message is required".to_string(),
            )),
        }
    }
}

/// What a successful turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub content: String,
    /// Remote thread backing the conversation, for the run transport.
    pub thread_id: Option<ThreadId>,
    /// Timing for the native stream transport.
    pub metrics: Option<StreamMetrics>,
}

/// Emits the single terminal event for a finished turn.
pub(super) async fn emit_terminal(
    sink: &mut EventSink,
    result: &Result<ChatReply, GatewayError>,
    elapsed_ms: u64,
) {
    let event = match result {
        Ok(reply) => StreamEvent::Complete {
            content: reply.content.clone(),
            metrics: reply.metrics.clone(),
            thread_id: reply.thread_id.clone(),
        },
        Err(GatewayError::Cancelled) => {
            tracing::info!(elapsed_ms, "client disconnected");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, elapsed_ms, "chat turn failed");
            StreamEvent::error(e.client_message(), elapsed_ms)
        }
    };
    sink.emit(event).await;
}
