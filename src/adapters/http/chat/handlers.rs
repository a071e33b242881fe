//! HTTP handlers for the chat endpoints.
//!
//! `Accept: text/event-stream` selects an SSE response fed live from the
//! turn's event channel; anything else waits for the turn and answers with
//! a single JSON body.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self, Stream};
use tokio::sync::mpsc;

use super::dto::{ChatRequestDto, ChatResponseDto, ErrorResponse, StatsResponse};
use crate::adapters::http::middleware::{Authentication, RequireAuth};
use crate::application::{
    AssistantChatHandler, ChatCommand, ChatReply, EventSink, GatewayError, HealthRouter,
    PerformanceCounters, StreamChatHandler,
};
use crate::domain::foundation::{AuthError, AuthenticatedUser, RequestId};
use crate::domain::run::PollMode;
use crate::domain::stream::StreamEvent;
use crate::ports::ConversationCache;

/// Events buffered per request before the turn waits on the client.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Correlation header read from requests and echoed on responses.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for chat handlers.
#[derive(Clone)]
pub struct ChatAppState {
    pub stream_handler: Arc<StreamChatHandler>,
    pub assistant_handler: Arc<AssistantChatHandler>,
    pub counters: Arc<PerformanceCounters>,
    pub cache: Arc<dyn ConversationCache>,
    pub router: Arc<HealthRouter>,
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Copy)]
enum Transport {
    Native,
    Assistant,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/chat/stream
pub async fn stream_chat(
    State(state): State<ChatAppState>,
    Authentication(auth): Authentication,
    headers: HeaderMap,
    payload: Result<Json<ChatRequestDto>, JsonRejection>,
) -> Response {
    dispatch(state, Transport::Native, auth, &headers, payload).await
}

/// POST /api/chat/assistant
pub async fn assistant_chat(
    State(state): State<ChatAppState>,
    Authentication(auth): Authentication,
    headers: HeaderMap,
    payload: Result<Json<ChatRequestDto>, JsonRejection>,
) -> Response {
    dispatch(state, Transport::Assistant, auth, &headers, payload).await
}

/// GET /api/chat/stats
pub async fn chat_stats(
    State(state): State<ChatAppState>,
    RequireAuth(_user): RequireAuth,
) -> Json<StatsResponse> {
    let cache_entries = match state.cache.len().await {
        Ok(len) => Some(len),
        Err(e) => {
            tracing::warn!(error = %e, "cache size unavailable");
            None
        }
    };

    Json(StatsResponse {
        performance: state.counters.stats(),
        cache_entries,
        instances: state.router.snapshot().await,
    })
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Dispatch
// ════════════════════════════════════════════════════════════════════════════════

async fn dispatch(
    state: ChatAppState,
    transport: Transport,
    auth: Result<AuthenticatedUser, AuthError>,
    headers: &HeaderMap,
    payload: Result<Json<ChatRequestDto>, JsonRejection>,
) -> Response {
    let request_id = request_id(headers);
    let mut response = respond(state, transport, auth, headers, payload, request_id).await;
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn respond(
    state: ChatAppState,
    transport: Transport,
    auth: Result<AuthenticatedUser, AuthError>,
    headers: &HeaderMap,
    payload: Result<Json<ChatRequestDto>, JsonRejection>,
    request_id: RequestId,
) -> Response {
    let wants_sse = accepts_event_stream(headers);

    let command = auth.map_err(GatewayError::from).and_then(|user| {
        let Json(body) =
            payload.map_err(|rejection| GatewayError::BadRequest(rejection.body_text()))?;
        body.into_command(user)
    });

    let command = match command {
        Ok(command) => command,
        Err(e) => {
            tracing::info!(request_id = %request_id, error = %e, "chat request rejected");
            return if wants_sse {
                single_event(StreamEvent::error(e.client_message(), 0))
            } else {
                error_response(&e)
            };
        }
    };

    // A watched stream polls tightly; a caller blocked on one JSON body
    // can wait on the slower schedule.
    let mode = if wants_sse {
        PollMode::Interactive
    } else {
        PollMode::Batch
    };
    let command = command.with_request_id(request_id).with_mode(mode);

    let (sink, rx) = EventSink::channel(state.channel_capacity);
    let turn = run_turn(state, transport, command, sink);

    if wants_sse {
        tokio::spawn(turn);
        event_stream(rx).into_response()
    } else {
        let (result, ()) = tokio::join!(turn, drain(rx));
        match result {
            Ok(reply) => Json(ChatResponseDto::from(reply)).into_response(),
            Err(e) => error_response(&e),
        }
    }
}

/// Caller's `x-request-id` when it is a UUID, else a fresh one.
fn request_id(headers: &HeaderMap) -> RequestId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| RequestId::parse(value).ok())
        .unwrap_or_default()
}

async fn run_turn(
    state: ChatAppState,
    transport: Transport,
    command: ChatCommand,
    sink: EventSink,
) -> Result<ChatReply, GatewayError> {
    match transport {
        Transport::Native => state.stream_handler.handle(command, sink).await,
        Transport::Assistant => state.assistant_handler.handle(command, sink).await,
    }
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains("text/event-stream"))
}

fn to_sse(event: &StreamEvent) -> Result<Event, axum::Error> {
    Event::default().event(event.name()).json_data(event)
}

fn event_stream(
    rx: mpsc::Receiver<StreamEvent>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((to_sse(&event), rx))
    });
    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

fn single_event(event: StreamEvent) -> Response {
    let frame = stream::once(async move { to_sse(&event) });
    Sse::new(frame).into_response()
}

/// Consumes events nobody will see so the turn never blocks on the channel.
async fn drain(mut rx: mpsc::Receiver<StreamEvent>) {
    while rx.recv().await.is_some() {}
}

fn error_response(error: &GatewayError) -> Response {
    (
        error.status_code(),
        Json(ErrorResponse {
            error: error.client_message(),
        }),
    )
        .into_response()
}
