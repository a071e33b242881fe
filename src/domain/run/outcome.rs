//! Terminal result of driving a run to completion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::RunStatus;

/// How a poll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    Completed,
    Failed,
    Expired,
    Cancelled,
    /// The attempt or wall-clock budget ran out first.
    Timeout,
    /// The client went away; polling stopped early.
    Aborted,
}

impl PollStatus {
    /// Maps a terminal run status to a poll status.
    pub fn from_terminal(status: RunStatus) -> Option<Self> {
        match status {
            RunStatus::Completed => Some(PollStatus::Completed),
            RunStatus::Failed => Some(PollStatus::Failed),
            RunStatus::Expired => Some(PollStatus::Expired),
            RunStatus::Cancelled => Some(PollStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether the backend instance should be charged with a failure.
    ///
    /// A client disconnect says nothing about the backend.
    pub fn counts_against_instance(&self) -> bool {
        !matches!(self, PollStatus::Completed | PollStatus::Aborted)
    }
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollStatus::Completed => "completed",
            PollStatus::Failed => "failed",
            PollStatus::Expired => "expired",
            PollStatus::Cancelled => "cancelled",
            PollStatus::Timeout => "timeout",
            PollStatus::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Result of `RunPoller::poll_for_completion`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub status: PollStatus,
    /// Final assistant text; present only when `status == Completed`.
    pub content: Option<String>,
    /// Status checks performed.
    pub attempts: u32,
    pub elapsed: Duration,
    /// Upstream or local explanation for a non-completed outcome.
    pub detail: Option<String>,
}

impl PollOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == PollStatus::Completed
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}
