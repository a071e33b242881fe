//! Client-facing event protocol.
//!
//! Every stream, whichever upstream transport produced it, is a `start`
//! followed by `status`/`token` events and exactly one terminal `complete`
//! or `error`.

use serde::Serialize;

use super::StreamMetrics;
use crate::domain::foundation::ThreadId;

/// Status message emitted while an asynchronous run is being polled.
pub const THINKING_STATUS: &str = "thinking";

/// One event on a client stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Start,
    Status {
        message: String,
    },
    Token {
        delta: String,
        /// Everything streamed so far, including `delta`.
        content: String,
    },
    Complete {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        metrics: Option<StreamMetrics>,
        #[serde(rename = "threadId", skip_serializing_if = "Option::is_none")]
        thread_id: Option<ThreadId>,
    },
    Error {
        message: String,
        #[serde(rename = "elapsedMs")]
        elapsed_ms: u64,
    },
}

impl StreamEvent {
    pub fn status(message: impl Into<String>) -> Self {
        StreamEvent::Status {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>, elapsed_ms: u64) -> Self {
        StreamEvent::Error {
            message: message.into(),
            elapsed_ms,
        }
    }

    /// SSE event name for this event.
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Start => "start",
            StreamEvent::Status { .. } => "status",
            StreamEvent::Token { .. } => "token",
            StreamEvent::Complete { .. } => "complete",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// `complete` and `error` end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }
}
