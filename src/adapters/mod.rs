//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the gateway core to external systems:
//! - `ai` - Upstream AI provider clients (chat streaming, assistant runs) and mocks
//! - `auth` - Session validators (OIDC, static tokens, mock)
//! - `cache` - Conversation cache backends (in-memory, Redis)
//! - `settings` - Per-user agent settings stores
//! - `http` - Axum router, middleware and handlers

pub mod ai;
pub mod auth;
pub mod cache;
pub mod http;
pub mod settings;
