//! HTTP adapters - REST and SSE endpoints.

pub mod chat;
pub mod middleware;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use chat::{chat_router, ChatAppState};
pub use middleware::AuthState;

/// Full application router: liveness plus the authenticated chat API.
pub fn app_router(state: ChatAppState, auth: AuthState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(chat::health))
        .merge(chat_router(auth))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
