//! Asynchronous "thread → run → poll" transport port.
//!
//! Mirrors the six upstream endpoints the gateway needs. Every call is
//! scoped to the backend instance chosen by the health router.

use async_trait::async_trait;

use super::{InstanceCredentials, ProviderError};
use crate::domain::foundation::{RunId, ThreadId};
use crate::domain::run::{RunSnapshot, RunStatus, ToolOutput};

/// Port for providers that only offer asynchronous runs.
#[async_trait]
pub trait AssistantRunsProvider: Send + Sync {
    /// Create a new, empty conversation thread.
    async fn create_thread(
        &self,
        credentials: &InstanceCredentials,
    ) -> Result<ThreadId, ProviderError>;

    /// Append a user message to a thread.
    async fn add_message(
        &self,
        credentials: &InstanceCredentials,
        thread_id: &ThreadId,
        content: &str,
    ) -> Result<(), ProviderError>;

    /// Start a run of the instance's assistant on a thread.
    async fn create_run(
        &self,
        credentials: &InstanceCredentials,
        thread_id: &ThreadId,
        instructions: Option<&str>,
    ) -> Result<(RunId, RunStatus), ProviderError>;

    /// Read the current status of a run.
    async fn get_run(
        &self,
        credentials: &InstanceCredentials,
        thread_id: &ThreadId,
        run_id: &RunId,
    ) -> Result<RunSnapshot, ProviderError>;

    /// Answer the tool calls a run is blocked on.
    async fn submit_tool_outputs(
        &self,
        credentials: &InstanceCredentials,
        thread_id: &ThreadId,
        run_id: &RunId,
        outputs: Vec<ToolOutput>,
    ) -> Result<(), ProviderError>;

    /// Fetch the assistant's reply produced by a run.
    ///
    /// Returns `None` when the run produced no assistant text.
    async fn latest_assistant_message(
        &self,
        credentials: &InstanceCredentials,
        thread_id: &ThreadId,
        run_id: &RunId,
    ) -> Result<Option<String>, ProviderError>;
}
