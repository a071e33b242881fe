//! Orchestrator error taxonomy.
//!
//! Every failure on a request path ends up as one of these, and from there
//! as exactly one `error` event or one non-2xx JSON response.

use http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::AuthError;
use crate::domain::run::PollStatus;
use crate::ports::ProviderError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("assistant run ended as {status}")]
    RunFailed {
        status: PollStatus,
        detail: Option<String>,
    },

    #[error("timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("request cancelled")]
    Cancelled,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn upstream(context: &'static str, source: ProviderError) -> Self {
        GatewayError::Upstream { context, source }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Auth(AuthError::ServiceUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Upstream {
                source: ProviderError::Timeout { .. },
                ..
            } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Upstream { .. } | GatewayError::RunFailed { .. } => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            // Client closed request; nobody reads this status.
            GatewayError::Cancelled => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST)
            }
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable message safe to show the end user.
    pub fn client_message(&self) -> String {
        match self {
            GatewayError::Auth(AuthError::MissingToken) => "Authentication required".to_string(),
            GatewayError::Auth(AuthError::TokenExpired) => {
                "Your session has expired, please sign in again".to_string()
            }
            GatewayError::Auth(AuthError::InvalidToken) => "Invalid credentials".to_string(),
            GatewayError::Auth(AuthError::ServiceUnavailable(_)) => {
                "Authentication service unavailable".to_string()
            }
            GatewayError::Upstream { context, source } => match source {
                ProviderError::RateLimited { .. } => {
                    format!("{context}: the AI service is busy, please retry shortly")
                }
                ProviderError::Timeout { timeout_secs } => {
                    format!("{context}: no response within {timeout_secs}s")
                }
                _ => format!("{context}: the AI service returned an error"),
            },
            GatewayError::RunFailed { status, detail } => match (status, detail) {
                (PollStatus::Expired, _) => "The assistant run expired before finishing".to_string(),
                (PollStatus::Cancelled, _) => "The assistant run was cancelled".to_string(),
                (_, Some(detail)) => format!("The assistant could not complete: {detail}"),
                (_, None) => "The assistant could not complete the request".to_string(),
            },
            GatewayError::Timeout { elapsed_ms } => format!(
                "The assistant did not answer in time ({:.1}s)",
                *elapsed_ms as f64 / 1000.0
            ),
            GatewayError::Cancelled => "Request cancelled".to_string(),
            GatewayError::BadRequest(reason) => reason.clone(),
            GatewayError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_401() {
        let err = GatewayError::from(AuthError::InvalidToken);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            GatewayError::from(AuthError::service_unavailable("jwks down")).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn upstream_errors_map_to_502_or_504() {
        let err = GatewayError::upstream("Failed to create thread", ProviderError::unavailable("down"));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.client_message().starts_with("Failed to create thread"));

        let err = GatewayError::upstream("Chat stream", ProviderError::Timeout { timeout_secs: 30 });
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn poll_timeouts_map_to_504_with_elapsed_time() {
        let err = GatewayError::Timeout { elapsed_ms: 45_000 };
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(err.client_message().contains("45.0s"));
    }

    #[test]
    fn run_failures_include_detail() {
        let err = GatewayError::RunFailed {
            status: PollStatus::Failed,
            detail: Some("rate limit exceeded".to_string()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.client_message().contains("rate limit exceeded"));
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let err = GatewayError::Internal("mutex poisoned at 0xdead".to_string());
        assert_eq!(err.client_message(), "Internal server error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn bad_request_is_400() {
        let err = GatewayError::BadRequest("messages must not be empty".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.client_message(), "messages must not be empty");
    }
}
