//! Authentication middleware and extractors for axum.
//!
//! This module provides:
//! - `auth_middleware` - Layer that validates Bearer tokens and records the result
//! - `Authentication` - Extractor yielding the user or the auth failure
//! - `RequireAuth` - Extractor that rejects unauthenticated requests with 401
//!
//! # Architecture
//!
//! The middleware uses the `SessionValidator` port, keeping it provider-agnostic.
//! It never rejects a request itself: chat handlers must be able to report an
//! auth failure as an SSE `error` event, so the outcome is left in extensions.
//!
//! ```text
//! Request → auth_middleware → AuthenticatedUser | AuthFailure in extensions
//!                                      ↓
//!                   Handler → Authentication / RequireAuth extractor
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::SessionValidator;

/// Auth middleware state - wraps the session validator.
pub type AuthState = Arc<dyn SessionValidator>;

/// Why a request is not authenticated, as recorded by the middleware.
#[derive(Debug, Clone)]
pub struct AuthFailure(pub AuthError);

/// Authentication middleware that validates Bearer tokens.
///
/// Expects the token in the `Authorization` header with `Bearer` prefix:
/// ```text
/// Authorization: Bearer <token>
/// ```
pub async fn auth_middleware(
    State(validator): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(&request);

    let outcome = match token {
        Some(token) => validator.validate(token).await,
        None => Err(AuthError::MissingToken),
    };

    match outcome {
        Ok(user) => {
            request.extensions_mut().insert(user);
        }
        Err(e) => {
            if let AuthError::ServiceUnavailable(msg) = &e {
                tracing::error!("Auth service unavailable: {}", msg);
            } else {
                tracing::debug!(error = %e, "request not authenticated");
            }
            request.extensions_mut().insert(AuthFailure(e));
        }
    }
    next.run(request).await
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn read_outcome(extensions: &axum::http::Extensions) -> Result<AuthenticatedUser, AuthError> {
    if let Some(user) = extensions.get::<AuthenticatedUser>() {
        return Ok(user.clone());
    }
    Err(extensions
        .get::<AuthFailure>()
        .map(|failure| failure.0.clone())
        .unwrap_or(AuthError::MissingToken))
}

/// Extractor carrying the authentication outcome.
///
/// Never rejects; the handler decides how to report a failure.
#[derive(Debug, Clone)]
pub struct Authentication(pub Result<AuthenticatedUser, AuthError>);

impl<S> axum::extract::FromRequestParts<S> for Authentication
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move { Ok(Authentication(read_outcome(&parts.extensions))) })
    }
}

/// Extractor that requires authentication.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            read_outcome(&parts.extensions)
                .map(RequireAuth)
                .map_err(AuthRejection)
        })
    }
}

/// Rejection type for authentication failures.
#[derive(Debug, Clone)]
pub struct AuthRejection(pub AuthError);

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::ServiceUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Authentication service unavailable",
            ),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use crate::domain::foundation::UserId;
    use axum::body::Body;
    use axum::extract::FromRequestParts;
    use axum::routing::get;
    use axum::{middleware, Router};
    use tower::ServiceExt;

    fn test_user() -> AuthenticatedUser {
        AuthenticatedUser::new(
            UserId::new("user-123").unwrap(),
            Some("test@example.com".to_string()),
            Some("Test User".to_string()),
        )
    }

    async fn whoami(Authentication(outcome): Authentication) -> String {
        match outcome {
            Ok(user) => user.id.to_string(),
            Err(e) => format!("denied: {e:?}"),
        }
    }

    fn app(validator: MockSessionValidator) -> Router {
        let state: AuthState = Arc::new(validator);
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(state, auth_middleware))
    }

    async fn call(app: Router, auth: Option<&str>) -> String {
        let mut builder = axum::http::Request::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Middleware Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn valid_token_records_user() {
        let validator = MockSessionValidator::new().with_user("good", test_user());
        assert_eq!(call(app(validator), Some("Bearer good")).await, "user-123");
    }

    #[tokio::test]
    async fn missing_header_records_missing_token() {
        let body = call(app(MockSessionValidator::new()), None).await;
        assert_eq!(body, "denied: MissingToken");
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_missing_token() {
        let body = call(app(MockSessionValidator::new()), Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(body, "denied: MissingToken");
    }

    #[tokio::test]
    async fn unknown_token_records_invalid_token() {
        let body = call(app(MockSessionValidator::new()), Some("Bearer nope")).await;
        assert_eq!(body, "denied: InvalidToken");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Extractor Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn require_auth_extracts_user_from_extensions() {
        let mut request: axum::http::Request<()> =
            axum::http::Request::builder().uri("/test").body(()).unwrap();
        request.extensions_mut().insert(test_user());
        let (mut parts, _body) = request.into_parts();

        let RequireAuth(user) = RequireAuth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.email.as_deref(), Some("test@example.com"));
    }

    #[tokio::test]
    async fn require_auth_surfaces_recorded_failure() {
        let mut request: axum::http::Request<()> =
            axum::http::Request::builder().uri("/test").body(()).unwrap();
        request
            .extensions_mut()
            .insert(AuthFailure(AuthError::TokenExpired));
        let (mut parts, _body) = request.into_parts();

        let result = RequireAuth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection(AuthError::TokenExpired))));
    }

    #[test]
    fn rejection_status_codes() {
        assert_eq!(
            AuthRejection(AuthError::MissingToken).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection(AuthError::service_unavailable("down"))
                .into_response()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
