//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the gateway core and the outside world. Adapters implement these ports.
//!
//! ## Upstream Ports
//!
//! - `ChatStreamProvider` - Native token-delta streaming
//! - `AssistantRunsProvider` - Asynchronous thread/run job protocol
//!
//! ## State Ports
//!
//! - `ConversationCache` - (user, agent) → remote thread handles
//! - `AgentSettingsReader` - Per-user agent setting overrides
//!
//! ## Identity Port
//!
//! - `SessionValidator` - Bearer token validation by the identity collaborator

mod agent_settings;
mod assistant_runs;
mod chat_stream;
mod conversation_cache;
mod provider_error;
mod session_validator;

pub use agent_settings::{AgentSettingsReader, SettingsLookupError};
pub use assistant_runs::AssistantRunsProvider;
pub use chat_stream::{
    ByteStream, ChatMessage, ChatRequest, ChatRole, ChatStreamProvider, InstanceCredentials,
};
pub use conversation_cache::{CacheError, ConversationCache};
pub use provider_error::ProviderError;
pub use session_validator::SessionValidator;
