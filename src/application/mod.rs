//! Application layer - Services and Handlers.
//!
//! Process-wide services (health router, counters, settings resolution,
//! cache janitor) are constructed once and shared by the chat handlers.
//! The stream relay and run poller drive each individual turn.

pub mod agent_settings;
pub mod cache_janitor;
pub mod counters;
pub mod error;
pub mod handlers;
pub mod health_router;
pub mod relay;
pub mod run_poller;

pub use agent_settings::AgentSettingsResolver;
pub use cache_janitor::CacheJanitor;
pub use counters::{PerformanceCounters, PerformanceStats};
pub use error::GatewayError;
pub use handlers::{AssistantChatHandler, ChatCommand, ChatReply, StreamChatHandler};
pub use health_router::HealthRouter;
pub use relay::EventSink;
pub use run_poller::RunPoller;
