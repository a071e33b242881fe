//! Settling a poller outcome into a reply.

use crate::application::error::GatewayError;
use crate::domain::run::{PollOutcome, PollStatus};

/// Assistant text for a completed run, or the error the client should see.
pub fn settle_poll_outcome(outcome: PollOutcome) -> Result<String, GatewayError> {
    match outcome.status {
        PollStatus::Completed => outcome.content.ok_or_else(|| GatewayError::RunFailed {
            status: PollStatus::Failed,
            detail: Some("run completed without an assistant message".to_string()),
        }),
        PollStatus::Timeout => Err(GatewayError::Timeout {
            elapsed_ms: outcome.elapsed_ms(),
        }),
        PollStatus::Aborted => Err(GatewayError::Cancelled),
        status @ (PollStatus::Failed | PollStatus::Expired | PollStatus::Cancelled) => {
            Err(GatewayError::RunFailed {
                status,
                detail: outcome.detail,
            })
        }
    }
}
