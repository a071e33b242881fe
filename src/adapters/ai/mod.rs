//! AI Provider Adapters.
//!
//! Implementations of the two upstream transport ports.
//!
//! ## Available Adapters
//!
//! - `OpenAIChatProvider` - Streaming chat completions (`ChatStreamProvider`)
//! - `OpenAIAssistantsProvider` - Thread/run job protocol (`AssistantRunsProvider`)
//! - `MockChatProvider` - Scripted SSE chunks for testing
//! - `MockAssistantsProvider` - Scripted run statuses for testing

mod mock_assistants;
mod mock_chat;
mod openai_assistants;
mod openai_chat;
mod openai_config;

pub use mock_assistants::{AssistantsCall, MockAssistantsProvider};
pub use mock_chat::{sse_delta, MockChatProvider, MockChunk, RecordedChatCall, SSE_DONE};
pub use openai_assistants::OpenAIAssistantsProvider;
pub use openai_chat::OpenAIChatProvider;
pub use openai_config::OpenAIConfig;
