//! Drives an asynchronous assistant run to a terminal state.
//!
//! The poller sleeps on an attempt-keyed schedule between status reads,
//! answers `requires_action` stalls with placeholder tool outputs, and
//! stops at the first of: a terminal status, the attempt budget, the
//! global timeout, or cancellation of the request.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::domain::foundation::{RunId, ThreadId};
use crate::domain::run::{
    PollBudget, PollMode, PollOutcome, PollSchedule, PollStatus, RunJob, RunSnapshot, RunStatus,
    ToolOutput,
};
use crate::ports::{AssistantRunsProvider, InstanceCredentials};

pub struct RunPoller {
    provider: Arc<dyn AssistantRunsProvider>,
}

impl RunPoller {
    pub fn new(provider: Arc<dyn AssistantRunsProvider>) -> Self {
        Self { provider }
    }

    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(
        skip(self, credentials, cancel),
        fields(instance = %credentials.instance_id)
    )]
    pub async fn poll_for_completion(
        &self,
        credentials: &InstanceCredentials,
        thread_id: &ThreadId,
        run_id: &RunId,
        initial_status: RunStatus,
        budget: PollBudget,
        mode: PollMode,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let schedule = PollSchedule::for_mode(mode);
        let mut job = RunJob::new(thread_id.clone(), run_id.clone(), initial_status);
        let mut last_error = None;

        while !job.status.is_terminal() && job.attempts < budget.max_attempts {
            let elapsed = job.started_at.elapsed();
            if elapsed >= budget.global_timeout {
                break;
            }
            let wait = schedule
                .interval_for(job.attempts)
                .min(budget.global_timeout - elapsed);

            tokio::select! {
                _ = cancel.cancelled() => return aborted(&job),
                _ = tokio::time::sleep(wait) => {}
            }

            let read = tokio::select! {
                _ = cancel.cancelled() => return aborted(&job),
                read = self.provider.get_run(credentials, thread_id, run_id) => read,
            };

            match read {
                Ok(snapshot) => {
                    job.observe(snapshot.status);
                    tracing::debug!(attempt = job.attempts, status = %snapshot.status.as_str(), "run status");
                    if snapshot.last_error.is_some() {
                        last_error = snapshot.last_error.clone();
                    }
                    if snapshot.status == RunStatus::RequiresAction {
                        tokio::select! {
                            _ = cancel.cancelled() => return aborted(&job),
                            _ = self.resolve_tool_calls(credentials, &job, &snapshot) => {}
                        }
                    }
                }
                Err(e) => {
                    job.observe_failed_read();
                    tracing::warn!(attempt = job.attempts, error = %e, "run status read failed, still pending");
                }
            }
        }

        self.settle(credentials, &job, last_error, budget, cancel).await
    }

    /// Answers every pending tool call with the "disabled" placeholder.
    async fn resolve_tool_calls(
        &self,
        credentials: &InstanceCredentials,
        job: &RunJob,
        snapshot: &RunSnapshot,
    ) {
        if snapshot.pending_tool_calls.is_empty() {
            return;
        }
        let outputs: Vec<ToolOutput> = snapshot
            .pending_tool_calls
            .iter()
            .map(ToolOutput::disabled)
            .collect();
        let count = outputs.len();

        match self
            .provider
            .submit_tool_outputs(credentials, &job.thread_id, &job.run_id, outputs)
            .await
        {
            Ok(()) => tracing::info!(run = %job.run_id, count, "auto-resolved stalled run"),
            Err(e) => tracing::warn!(run = %job.run_id, error = %e, "tool output submission failed"),
        }
    }

    async fn settle(
        &self,
        credentials: &InstanceCredentials,
        job: &RunJob,
        last_error: Option<String>,
        budget: PollBudget,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let Some(status) = PollStatus::from_terminal(job.status) else {
            tracing::warn!(
                attempts = job.attempts,
                max_attempts = budget.max_attempts,
                status = %job.status.as_str(),
                "poll budget exhausted"
            );
            return outcome(
                job,
                PollStatus::Timeout,
                None,
                Some(format!("run still {} after {} checks", job.status.as_str(), job.attempts)),
            );
        };

        if status != PollStatus::Completed {
            return outcome(job, status, None, last_error);
        }

        let reply = tokio::select! {
            _ = cancel.cancelled() => return aborted(job),
            reply = self.provider.latest_assistant_message(credentials, &job.thread_id, &job.run_id) => reply,
        };

        match reply {
            Ok(Some(content)) => outcome(job, PollStatus::Completed, Some(content), None),
            Ok(None) => outcome(
                job,
                PollStatus::Failed,
                None,
                Some("run completed without an assistant message".to_string()),
            ),
            Err(e) => {
                tracing::warn!(run = %job.run_id, error = %e, "failed to fetch assistant message");
                outcome(job, PollStatus::Failed, None, Some(e.to_string()))
            }
        }
    }
}

fn outcome(
    job: &RunJob,
    status: PollStatus,
    content: Option<String>,
    detail: Option<String>,
) -> PollOutcome {
    PollOutcome {
        status,
        content,
        attempts: job.attempts,
        elapsed: job.started_at.elapsed(),
        detail,
    }
}

fn aborted(job: &RunJob) -> PollOutcome {
    tracing::debug!(run = %job.run_id, attempts = job.attempts, "polling aborted by client");
    outcome(job, PollStatus::Aborted, None, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{AssistantsCall, MockAssistantsProvider};
    use crate::domain::foundation::InstanceId;
    use crate::ports::ProviderError;
    use std::time::Duration;

    fn creds() -> InstanceCredentials {
        InstanceCredentials::new(InstanceId::new("asst_1").unwrap())
    }

    fn thread() -> ThreadId {
        ThreadId::new("thread_1").unwrap()
    }

    fn run() -> RunId {
        RunId::new("run_1").unwrap()
    }

    async fn poll(
        provider: &MockAssistantsProvider,
        budget: PollBudget,
        mode: PollMode,
    ) -> PollOutcome {
        RunPoller::new(Arc::new(provider.clone()))
            .poll_for_completion(
                &creds(),
                &thread(),
                &run(),
                RunStatus::Queued,
                budget,
                mode,
                &CancellationToken::new(),
            )
            .await
    }

    mod completion {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn completes_after_three_checks() {
            let provider = MockAssistantsProvider::new()
                .with_statuses(&[RunStatus::Queued, RunStatus::InProgress, RunStatus::Completed])
                .with_reply("The answer is 42.");

            let outcome = poll(&provider, PollBudget::standard(), PollMode::Interactive).await;

            assert_eq!(outcome.status, PollStatus::Completed);
            assert_eq!(outcome.content.as_deref(), Some("The answer is 42."));
            assert_eq!(outcome.attempts, 3);
            assert_eq!(provider.status_checks(), 3);
        }

        #[tokio::test(start_paused = true)]
        async fn empty_reply_is_demoted_to_failed() {
            let provider = MockAssistantsProvider::new()
                .with_statuses(&[RunStatus::Completed])
                .with_empty_reply();

            let outcome = poll(&provider, PollBudget::standard(), PollMode::Interactive).await;
            assert_eq!(outcome.status, PollStatus::Failed);
            assert!(outcome.content.is_none());
        }

        #[tokio::test(start_paused = true)]
        async fn reply_fetch_error_is_demoted_to_failed() {
            let provider = MockAssistantsProvider::new()
                .with_statuses(&[RunStatus::Completed])
                .with_reply_error(ProviderError::unavailable("messages endpoint down"));

            let outcome = poll(&provider, PollBudget::standard(), PollMode::Interactive).await;
            assert_eq!(outcome.status, PollStatus::Failed);
            assert!(outcome.detail.is_some());
        }

        #[tokio::test(start_paused = true)]
        async fn failed_run_keeps_terminal_status() {
            let provider = MockAssistantsProvider::new().with_statuses(&[
                RunStatus::Queued,
                RunStatus::InProgress,
                RunStatus::Failed,
            ]);

            let outcome = poll(&provider, PollBudget::standard(), PollMode::Interactive).await;
            assert_eq!(outcome.status, PollStatus::Failed);
            assert_eq!(provider.count(|c| matches!(c, AssistantsCall::LatestMessage { .. })), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn expired_run_is_reported() {
            let provider = MockAssistantsProvider::new().with_statuses(&[RunStatus::Expired]);
            let outcome = poll(&provider, PollBudget::standard(), PollMode::Batch).await;
            assert_eq!(outcome.status, PollStatus::Expired);
        }
    }

    mod budget {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn stops_at_max_attempts() {
            let provider = MockAssistantsProvider::new().with_statuses(&[RunStatus::InProgress]);
            let budget = PollBudget::new(5, Duration::from_secs(600));

            let outcome = poll(&provider, budget, PollMode::Interactive).await;

            assert_eq!(outcome.status, PollStatus::Timeout);
            assert_eq!(outcome.attempts, 5);
            assert_eq!(provider.status_checks(), 5);
        }

        #[tokio::test(start_paused = true)]
        async fn stops_at_global_timeout() {
            let provider = MockAssistantsProvider::new().with_statuses(&[RunStatus::InProgress]);
            let budget = PollBudget::new(1_000, Duration::from_secs(3));

            let outcome = poll(&provider, budget, PollMode::Interactive).await;

            assert_eq!(outcome.status, PollStatus::Timeout);
            assert!(outcome.attempts < 1_000);
            assert!(outcome.elapsed <= Duration::from_secs(3));
        }

        #[tokio::test(start_paused = true)]
        async fn interactive_polls_faster_than_batch() {
            let statuses = [RunStatus::Queued, RunStatus::InProgress, RunStatus::Completed];

            let interactive = MockAssistantsProvider::new().with_statuses(&statuses);
            let fast = poll(&interactive, PollBudget::standard(), PollMode::Interactive).await;

            let batch = MockAssistantsProvider::new().with_statuses(&statuses);
            let slow = poll(&batch, PollBudget::standard(), PollMode::Batch).await;

            assert_eq!(fast.attempts, slow.attempts);
            assert!(fast.elapsed < slow.elapsed);
        }

        #[tokio::test(start_paused = true)]
        async fn status_read_errors_count_as_attempts() {
            let provider = MockAssistantsProvider::new()
                .with_status_error(ProviderError::network("connection reset"))
                .with_statuses(&[RunStatus::Completed]);

            let outcome = poll(&provider, PollBudget::standard(), PollMode::Interactive).await;

            assert_eq!(outcome.status, PollStatus::Completed);
            assert_eq!(outcome.attempts, 2);
        }
    }

    mod tool_calls {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn submits_all_outputs_before_next_status_check() {
            let provider = MockAssistantsProvider::new()
                .with_statuses(&[RunStatus::InProgress])
                .with_tool_calls(&["call_a", "call_b", "call_c"])
                .with_statuses(&[RunStatus::Completed]);

            let outcome = poll(&provider, PollBudget::standard(), PollMode::Interactive).await;
            assert!(outcome.is_completed());

            let submitted = provider.submitted_outputs();
            assert_eq!(submitted.len(), 1);
            assert_eq!(submitted[0].len(), 3);
            assert!(submitted[0]
                .iter()
                .all(|o| o.output.contains("disabled")));

            let calls = provider.calls();
            let submit_at = calls
                .iter()
                .position(|c| matches!(c, AssistantsCall::SubmitToolOutputs { .. }))
                .unwrap();
            let reads_before = calls[..submit_at]
                .iter()
                .filter(|c| matches!(c, AssistantsCall::GetRun { .. }))
                .count();
            assert_eq!(reads_before, 2);
            assert!(matches!(calls[submit_at + 1], AssistantsCall::GetRun { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn submit_failure_keeps_polling() {
            let provider = MockAssistantsProvider::new()
                .with_tool_calls(&["call_a"])
                .with_statuses(&[RunStatus::Completed])
                .with_submit_error(ProviderError::unavailable("busy"));

            let outcome = poll(&provider, PollBudget::standard(), PollMode::Interactive).await;
            assert!(outcome.is_completed());
            assert_eq!(provider.submitted_outputs().len(), 1);
        }
    }

    mod cancellation {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn cancelled_token_aborts_without_reads() {
            let provider = MockAssistantsProvider::new().with_statuses(&[RunStatus::InProgress]);
            let cancel = CancellationToken::new();
            cancel.cancel();

            let outcome = RunPoller::new(Arc::new(provider.clone()))
                .poll_for_completion(
                    &creds(),
                    &thread(),
                    &run(),
                    RunStatus::Queued,
                    PollBudget::standard(),
                    PollMode::Interactive,
                    &cancel,
                )
                .await;

            assert_eq!(outcome.status, PollStatus::Aborted);
            assert_eq!(provider.status_checks(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn cancellation_mid_poll_stops_the_loop() {
            let provider = MockAssistantsProvider::new().with_statuses(&[RunStatus::InProgress]);
            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                trigger.cancel();
            });

            let outcome = RunPoller::new(Arc::new(provider.clone()))
                .poll_for_completion(
                    &creds(),
                    &thread(),
                    &run(),
                    RunStatus::Queued,
                    PollBudget::standard(),
                    PollMode::Interactive,
                    &cancel,
                )
                .await;

            assert_eq!(outcome.status, PollStatus::Aborted);
            assert!(provider.status_checks() > 0);
            assert!(outcome.elapsed < Duration::from_secs(6));
        }
    }
}
