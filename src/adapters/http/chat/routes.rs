//! Axum routes for chat endpoints.

use axum::routing::{get, post};
use axum::{middleware, Router};

use super::handlers::{assistant_chat, chat_stats, stream_chat, ChatAppState};
use crate::adapters::http::middleware::{auth_middleware, AuthState};

/// Creates routes for chat endpoints.
///
/// - POST /api/chat/stream - Native token-stream transport
/// - POST /api/chat/assistant - Asynchronous run transport
/// - GET /api/chat/stats - Counters, cache size, instance health
pub fn chat_routes(auth: AuthState) -> Router<ChatAppState> {
    Router::new()
        .route("/chat/stream", post(stream_chat))
        .route("/chat/assistant", post(assistant_chat))
        .route("/chat/stats", get(chat_stats))
        .route_layer(middleware::from_fn_with_state(auth, auth_middleware))
}

/// Combined router with all chat routes under /api.
pub fn chat_router(auth: AuthState) -> Router<ChatAppState> {
    Router::new().nest("/api", chat_routes(auth))
}
