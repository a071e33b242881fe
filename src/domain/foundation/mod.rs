//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, identity types and validation errors that the
//! rest of the gateway is written in terms of.

mod auth;
mod errors;
mod ids;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::ValidationError;
pub use ids::{AgentId, InstanceId, RequestId, RunId, ThreadId, UserId};
pub use timestamp::Timestamp;
