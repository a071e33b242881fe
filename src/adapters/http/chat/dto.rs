//! Request and response DTOs for the chat endpoints.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::application::{ChatCommand, ChatReply, GatewayError, PerformanceStats};
use crate::domain::foundation::{AgentId, AuthenticatedUser, ThreadId};
use crate::domain::routing::InstanceHealth;
use crate::ports::{ChatMessage, ChatRole};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/chat/stream` and `POST /api/chat/assistant`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestDto {
    #[serde(default)]
    pub messages: Vec<MessageDto>,
    pub selected_agent: String,
    #[serde(default)]
    pub user_session: Option<UserSessionDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDto {
    pub role: String,
    pub content: String,
}

/// Session token the client cached from an earlier turn.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSessionDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

impl ChatRequestDto {
    pub fn into_command(self, user: AuthenticatedUser) -> Result<ChatCommand, GatewayError> {
        let agent = AgentId::new(self.selected_agent)
            .map_err(|_| GatewayError::BadRequest("selectedAgent must be a non-empty agent id".to_string()))?;

        let messages = self
            .messages
            .into_iter()
            .map(MessageDto::into_message)
            .collect::<Result<Vec<_>, _>>()?;

        let session_thread = self
            .user_session
            .and_then(|session| session.thread_id)
            .filter(|id| !id.trim().is_empty())
            .map(ThreadId::new)
            .transpose()
            .map_err(|_| GatewayError::BadRequest("invalid userSession.threadId".to_string()))?;

        Ok(ChatCommand::new(user, agent, messages).with_session_thread(session_thread))
    }
}

impl MessageDto {
    fn into_message(self) -> Result<ChatMessage, GatewayError> {
        let role = match self.role.to_ascii_lowercase().as_str() {
            "user" => ChatRole::User,
            "assistant" => ChatRole::Assistant,
            "system" => ChatRole::System,
            other => {
                return Err(GatewayError::BadRequest(format!(
                    "unsupported message role '{other}'"
                )))
            }
        };
        Ok(ChatMessage::new(role, self.content))
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

/// Non-streaming success body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponseDto {
    pub content: String,
    pub thread_id: Option<String>,
}

impl From<ChatReply> for ChatResponseDto {
    fn from(reply: ChatReply) -> Self {
        Self {
            content: reply.content,
            thread_id: reply.thread_id.map(|t| t.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of `GET /api/chat/stats`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub performance: PerformanceStats,
    /// `None` when the cache backend could not be reached.
    pub cache_entries: Option<usize>,
    pub instances: BTreeMap<String, InstanceHealth>,
}
