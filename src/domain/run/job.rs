//! A submitted run and the tool calls it may stall on.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::RunStatus;
use crate::domain::foundation::{RunId, ThreadId};

/// Output submitted for every tool call, since the gateway runs no tools.
pub const TOOL_CALLS_DISABLED_OUTPUT: &str =
    r#"{"error":"Tool calls are disabled for this agent"}"#;

/// One run being driven to completion by the poller.
///
/// Owned exclusively by the request task that submitted it.
#[derive(Debug, Clone)]
pub struct RunJob {
    pub thread_id: ThreadId,
    pub run_id: RunId,
    pub status: RunStatus,
    /// Status checks performed so far.
    pub attempts: u32,
    pub started_at: Instant,
}

impl RunJob {
    /// Starts tracking a freshly created run.
    pub fn new(thread_id: ThreadId, run_id: RunId, status: RunStatus) -> Self {
        Self {
            thread_id,
            run_id,
            status,
            attempts: 0,
            started_at: Instant::now(),
        }
    }

    /// Records the status observed by one poll.
    pub fn observe(&mut self, status: RunStatus) {
        self.attempts = self.attempts.saturating_add(1);
        self.status = status;
    }

    /// Records a poll whose status read failed; the run stays where it was.
    pub fn observe_failed_read(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }
}

/// A tool call the upstream run is blocked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingToolCall {
    pub id: String,
    pub function_name: String,
}

/// An answer to a pending tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

impl ToolOutput {
    /// The placeholder answer that unblocks a run without executing anything.
    pub fn disabled(call: &PendingToolCall) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            output: TOOL_CALLS_DISABLED_OUTPUT.to_string(),
        }
    }
}

/// Snapshot of a run returned by a status read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSnapshot {
    pub status: RunStatus,
    /// Populated only while `status == RequiresAction`.
    pub pending_tool_calls: Vec<PendingToolCall>,
    /// Upstream's explanation when the run failed, if any.
    pub last_error: Option<String>,
}

impl RunSnapshot {
    /// A snapshot carrying only a status.
    pub fn with_status(status: RunStatus) -> Self {
        Self {
            status,
            pending_tool_calls: Vec::new(),
            last_error: None,
        }
    }
}
