//! Session validation port for bearer tokens.
//!
//! The gateway delegates identity to an external collaborator. This port is
//! the only contract with it: hand over the raw bearer token, get back the
//! user it belongs to.
//!
//! # Contract
//!
//! Implementations must:
//! - Return `AuthError::InvalidToken` for malformed or badly signed tokens
//! - Return `AuthError::TokenExpired` for expired tokens
//! - Return `AuthError::ServiceUnavailable` for transient errors

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates access tokens and extracts user identity.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw token (without the "Bearer " prefix).
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
