//! Agent Gateway - real-time bridge in front of AI agent backends.
//!
//! Normalizes a native token-stream transport and an asynchronous
//! thread/run/poll transport into one client event protocol, caching
//! conversation handles per user and routing around unhealthy backends.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
