//! OpenAI Assistants adapter for the asynchronous run transport.
//!
//! Each backend instance id is an assistant id. Threads are created on
//! demand, messages appended, and runs polled by the run poller through
//! [`AssistantRunsProvider::get_run`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::openai_config::{build_client, check_status, OpenAIConfig};
use crate::domain::foundation::{RunId, ThreadId};
use crate::domain::run::{PendingToolCall, RunSnapshot, RunStatus, ToolOutput};
use crate::ports::{AssistantRunsProvider, InstanceCredentials, ProviderError};

/// OpenAI Assistants API provider.
pub struct OpenAIAssistantsProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIAssistantsProvider {
    pub fn new(config: OpenAIConfig) -> Result<Self, ProviderError> {
        let client = build_client(Client::builder().timeout(config.timeout))?;
        Ok(Self { config, client })
    }

    fn request(
        &self,
        builder: RequestBuilder,
        credentials: &InstanceCredentials,
    ) -> Result<RequestBuilder, ProviderError> {
        let builder = builder.header("OpenAI-Beta", self.config.assistants_beta.as_str());
        self.config.authorize(builder, credentials)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ProviderError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    timeout_secs: self.config.timeout.as_secs(),
                }
            } else {
                ProviderError::from(e)
            }
        })?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ProviderError::parse(format!("failed to parse response: {}", e)))
    }
}

#[async_trait]
impl AssistantRunsProvider for OpenAIAssistantsProvider {
    async fn create_thread(
        &self,
        credentials: &InstanceCredentials,
    ) -> Result<ThreadId, ProviderError> {
        let builder = self
            .client
            .post(self.config.url("threads"))
            .json(&serde_json::json!({}));
        let thread: IdObject = self.send(self.request(builder, credentials)?).await?;
        ThreadId::new(thread.id).map_err(|e| ProviderError::parse(e.to_string()))
    }

    async fn add_message(
        &self,
        credentials: &InstanceCredentials,
        thread_id: &ThreadId,
        content: &str,
    ) -> Result<(), ProviderError> {
        let builder = self
            .client
            .post(self.config.url(&format!("threads/{}/messages", thread_id)))
            .json(&NewMessage {
                role: "user",
                content,
            });
        let _: IdObject = self.send(self.request(builder, credentials)?).await?;
        Ok(())
    }

    async fn create_run(
        &self,
        credentials: &InstanceCredentials,
        thread_id: &ThreadId,
        instructions: Option<&str>,
    ) -> Result<(RunId, RunStatus), ProviderError> {
        let builder = self
            .client
            .post(self.config.url(&format!("threads/{}/runs", thread_id)))
            .json(&NewRun {
                assistant_id: credentials.instance_id.as_str(),
                additional_instructions: instructions,
            });
        let run: RunObject = self.send(self.request(builder, credentials)?).await?;
        let run_id = RunId::new(run.id).map_err(|e| ProviderError::parse(e.to_string()))?;
        Ok((run_id, run.status))
    }

    async fn get_run(
        &self,
        credentials: &InstanceCredentials,
        thread_id: &ThreadId,
        run_id: &RunId,
    ) -> Result<RunSnapshot, ProviderError> {
        let builder = self
            .client
            .get(self.config.url(&format!("threads/{}/runs/{}", thread_id, run_id)));
        let run: RunObject = self.send(self.request(builder, credentials)?).await?;
        Ok(run.into_snapshot())
    }

    async fn submit_tool_outputs(
        &self,
        credentials: &InstanceCredentials,
        thread_id: &ThreadId,
        run_id: &RunId,
        outputs: Vec<ToolOutput>,
    ) -> Result<(), ProviderError> {
        let builder = self
            .client
            .post(self.config.url(&format!(
                "threads/{}/runs/{}/submit_tool_outputs",
                thread_id, run_id
            )))
            .json(&ToolOutputsBody {
                tool_outputs: outputs,
            });
        let _: IdObject = self.send(self.request(builder, credentials)?).await?;
        Ok(())
    }

    async fn latest_assistant_message(
        &self,
        credentials: &InstanceCredentials,
        thread_id: &ThreadId,
        run_id: &RunId,
    ) -> Result<Option<String>, ProviderError> {
        let builder = self
            .client
            .get(self.config.url(&format!("threads/{}/messages", thread_id)))
            .query(&[("run_id", run_id.as_str()), ("order", "desc"), ("limit", "10")]);
        let list: MessageList = self.send(self.request(builder, credentials)?).await?;
        Ok(list.assistant_text())
    }
}

// ----- Assistants API Types -----

#[derive(Debug, Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Debug, Serialize)]
struct NewMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct NewRun<'a> {
    assistant_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_instructions: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ToolOutputsBody {
    tool_outputs: Vec<ToolOutput>,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    status: RunStatus,
    #[serde(default)]
    required_action: Option<RequiredAction>,
    #[serde(default)]
    last_error: Option<RunError>,
}

impl RunObject {
    fn into_snapshot(self) -> RunSnapshot {
        let pending_tool_calls = self
            .required_action
            .map(|action| {
                action
                    .submit_tool_outputs
                    .tool_calls
                    .into_iter()
                    .map(|call| PendingToolCall {
                        id: call.id,
                        function_name: call.function.map(|f| f.name).unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        RunSnapshot {
            status: self.status,
            pending_tool_calls,
            last_error: self.last_error.map(|e| e.message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RequiredAction {
    submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Deserialize)]
struct SubmitToolOutputs {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(default)]
    function: Option<ToolFunction>,
}

#[derive(Debug, Deserialize)]
struct ToolFunction {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RunError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

impl MessageList {
    /// Text of the newest assistant message, parts joined in order.
    fn assistant_text(self) -> Option<String> {
        self.data
            .into_iter()
            .find(|m| m.role == "assistant")
            .map(|m| {
                m.content
                    .into_iter()
                    .filter_map(|part| part.text.map(|t| t.value))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    text: Option<MessageText>,
}

#[derive(Debug, Deserialize)]
struct MessageText {
    value: String,
}
