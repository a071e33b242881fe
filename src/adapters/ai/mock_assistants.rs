//! Mock assistants provider for testing.
//!
//! Scripts the sequence of run statuses returned by `get_run` and records
//! every call in order, so tests can assert both what was sent upstream and
//! when (for example, that tool outputs land before the next status read).

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::foundation::{InstanceId, RunId, ThreadId};
use crate::domain::run::{PendingToolCall, RunSnapshot, RunStatus, ToolOutput};
use crate::ports::{AssistantRunsProvider, InstanceCredentials, ProviderError};

/// Upstream call as seen by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantsCall {
    CreateThread { instance_id: InstanceId },
    AddMessage { thread_id: ThreadId, content: String },
    CreateRun {
        instance_id: InstanceId,
        thread_id: ThreadId,
        instructions: Option<String>,
    },
    GetRun { run_id: RunId },
    SubmitToolOutputs { run_id: RunId, outputs: Vec<ToolOutput> },
    LatestMessage { run_id: RunId },
}

#[derive(Debug, Default)]
struct MockState {
    statuses: VecDeque<Result<RunSnapshot, ProviderError>>,
    last_status: Option<RunSnapshot>,
    reply: Option<Result<Option<String>, ProviderError>>,
    create_thread_error: Option<ProviderError>,
    add_message_error: Option<ProviderError>,
    missing_threads: Vec<ThreadId>,
    create_run_error: Option<ProviderError>,
    submit_error: Option<ProviderError>,
    threads_created: u32,
    runs_created: u32,
    calls: Vec<AssistantsCall>,
}

/// Scripted mock implementing `AssistantRunsProvider`.
#[derive(Debug, Clone, Default)]
pub struct MockAssistantsProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockAssistantsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Statuses returned by successive `get_run` calls. The last one repeats.
    pub fn with_statuses(self, statuses: &[RunStatus]) -> Self {
        self.state()
            .statuses
            .extend(statuses.iter().map(|s| Ok(RunSnapshot::with_status(*s))));
        self
    }

    /// Queues a `requires_action` snapshot with the given tool call ids.
    pub fn with_tool_calls(self, call_ids: &[&str]) -> Self {
        let snapshot = RunSnapshot {
            status: RunStatus::RequiresAction,
            pending_tool_calls: call_ids
                .iter()
                .map(|id| PendingToolCall {
                    id: id.to_string(),
                    function_name: "lookup".to_string(),
                })
                .collect(),
            last_error: None,
        };
        self.state().statuses.push_back(Ok(snapshot));
        self
    }

    /// Queues a failed status read.
    pub fn with_status_error(self, error: ProviderError) -> Self {
        self.state().statuses.push_back(Err(error));
        self
    }

    /// Assistant text returned after completion.
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.state().reply = Some(Ok(Some(reply.into())));
        self
    }

    /// Completion without any assistant text.
    pub fn with_empty_reply(self) -> Self {
        self.state().reply = Some(Ok(None));
        self
    }

    pub fn with_reply_error(self, error: ProviderError) -> Self {
        self.state().reply = Some(Err(error));
        self
    }

    pub fn with_create_thread_error(self, error: ProviderError) -> Self {
        self.state().create_thread_error = Some(error);
        self
    }

    pub fn with_add_message_error(self, error: ProviderError) -> Self {
        self.state().add_message_error = Some(error);
        self
    }

    /// `add_message` answers 404 for this thread, as if it was deleted
    /// upstream or never existed.
    pub fn with_missing_thread(self, thread_id: &str) -> Self {
        if let Ok(thread) = ThreadId::new(thread_id) {
            self.state().missing_threads.push(thread);
        }
        self
    }

    pub fn with_create_run_error(self, error: ProviderError) -> Self {
        self.state().create_run_error = Some(error);
        self
    }

    pub fn with_submit_error(self, error: ProviderError) -> Self {
        self.state().submit_error = Some(error);
        self
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<AssistantsCall> {
        self.state().calls.clone()
    }

    pub fn threads_created(&self) -> u32 {
        self.state().threads_created
    }

    pub fn status_checks(&self) -> usize {
        self.count(|c| matches!(c, AssistantsCall::GetRun { .. }))
    }

    /// All tool outputs submitted, one entry per submission.
    pub fn submitted_outputs(&self) -> Vec<Vec<ToolOutput>> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                AssistantsCall::SubmitToolOutputs { outputs, .. } => Some(outputs.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&AssistantsCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| predicate(c)).count()
    }
}

#[async_trait]
impl AssistantRunsProvider for MockAssistantsProvider {
    async fn create_thread(
        &self,
        credentials: &InstanceCredentials,
    ) -> Result<ThreadId, ProviderError> {
        let mut state = self.state();
        state.calls.push(AssistantsCall::CreateThread {
            instance_id: credentials.instance_id.clone(),
        });
        if let Some(error) = state.create_thread_error.clone() {
            return Err(error);
        }
        state.threads_created += 1;
        ThreadId::new(format!("thread_{}", state.threads_created))
            .map_err(|e| ProviderError::parse(e.to_string()))
    }

    async fn add_message(
        &self,
        _credentials: &InstanceCredentials,
        thread_id: &ThreadId,
        content: &str,
    ) -> Result<(), ProviderError> {
        let mut state = self.state();
        state.calls.push(AssistantsCall::AddMessage {
            thread_id: thread_id.clone(),
            content: content.to_string(),
        });
        if state.missing_threads.contains(thread_id) {
            return Err(ProviderError::NotFound(format!("No thread found with id '{thread_id}'")));
        }
        match state.add_message_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn create_run(
        &self,
        credentials: &InstanceCredentials,
        thread_id: &ThreadId,
        instructions: Option<&str>,
    ) -> Result<(RunId, RunStatus), ProviderError> {
        let mut state = self.state();
        state.calls.push(AssistantsCall::CreateRun {
            instance_id: credentials.instance_id.clone(),
            thread_id: thread_id.clone(),
            instructions: instructions.map(str::to_string),
        });
        if let Some(error) = state.create_run_error.clone() {
            return Err(error);
        }
        state.runs_created += 1;
        let run_id = RunId::new(format!("run_{}", state.runs_created))
            .map_err(|e| ProviderError::parse(e.to_string()))?;
        Ok((run_id, RunStatus::Queued))
    }

    async fn get_run(
        &self,
        _credentials: &InstanceCredentials,
        _thread_id: &ThreadId,
        run_id: &RunId,
    ) -> Result<RunSnapshot, ProviderError> {
        let mut state = self.state();
        state.calls.push(AssistantsCall::GetRun {
            run_id: run_id.clone(),
        });
        match state.statuses.pop_front() {
            Some(Ok(snapshot)) => {
                state.last_status = Some(snapshot.clone());
                Ok(snapshot)
            }
            Some(Err(error)) => Err(error),
            None => Ok(state
                .last_status
                .clone()
                .unwrap_or_else(|| RunSnapshot::with_status(RunStatus::Completed))),
        }
    }

    async fn submit_tool_outputs(
        &self,
        _credentials: &InstanceCredentials,
        _thread_id: &ThreadId,
        run_id: &RunId,
        outputs: Vec<ToolOutput>,
    ) -> Result<(), ProviderError> {
        let mut state = self.state();
        state.calls.push(AssistantsCall::SubmitToolOutputs {
            run_id: run_id.clone(),
            outputs,
        });
        // The run moves on once outputs are in; a repeating requires_action
        // snapshot would otherwise pin the script.
        if state
            .last_status
            .as_ref()
            .is_some_and(|s| s.status == RunStatus::RequiresAction)
        {
            state.last_status = Some(RunSnapshot::with_status(RunStatus::InProgress));
        }
        match state.submit_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn latest_assistant_message(
        &self,
        _credentials: &InstanceCredentials,
        _thread_id: &ThreadId,
        run_id: &RunId,
    ) -> Result<Option<String>, ProviderError> {
        let mut state = self.state();
        state.calls.push(AssistantsCall::LatestMessage {
            run_id: run_id.clone(),
        });
        state
            .reply
            .clone()
            .unwrap_or_else(|| Ok(Some("Mock response".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> InstanceCredentials {
        InstanceCredentials::new(InstanceId::new("asst_1").unwrap())
    }

    #[tokio::test]
    async fn statuses_replay_in_order_and_last_repeats() {
        let provider =
            MockAssistantsProvider::new().with_statuses(&[RunStatus::Queued, RunStatus::InProgress]);
        let thread = provider.create_thread(&creds()).await.unwrap();
        let (run, _) = provider.create_run(&creds(), &thread, None).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(provider.get_run(&creds(), &thread, &run).await.unwrap().status);
        }
        assert_eq!(
            seen,
            vec![RunStatus::Queued, RunStatus::InProgress, RunStatus::InProgress]
        );
        assert_eq!(provider.status_checks(), 3);
    }

    #[tokio::test]
    async fn thread_ids_are_sequential() {
        let provider = MockAssistantsProvider::new();
        assert_eq!(provider.create_thread(&creds()).await.unwrap().as_str(), "thread_1");
        assert_eq!(provider.create_thread(&creds()).await.unwrap().as_str(), "thread_2");
        assert_eq!(provider.threads_created(), 2);
    }

    #[tokio::test]
    async fn injected_errors_surface() {
        let provider = MockAssistantsProvider::new()
            .with_create_thread_error(ProviderError::unavailable("down"));
        assert!(provider.create_thread(&creds()).await.is_err());
        assert_eq!(provider.threads_created(), 0);
    }

    #[tokio::test]
    async fn submitted_outputs_are_recorded() {
        let provider = MockAssistantsProvider::new().with_tool_calls(&["a", "b"]);
        let thread = ThreadId::new("t").unwrap();
        let run = RunId::new("r").unwrap();
        let snapshot = provider.get_run(&creds(), &thread, &run).await.unwrap();
        let outputs: Vec<_> = snapshot
            .pending_tool_calls
            .iter()
            .map(ToolOutput::disabled)
            .collect();
        provider
            .submit_tool_outputs(&creds(), &thread, &run, outputs)
            .await
            .unwrap();

        assert_eq!(provider.submitted_outputs()[0].len(), 2);
        let next = provider.get_run(&creds(), &thread, &run).await.unwrap();
        assert_eq!(next.status, RunStatus::InProgress);
    }
}
