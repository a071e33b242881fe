//! Authentication adapters.
//!
//! Implementations of the `SessionValidator` port:
//!
//! - `oidc` - JWKS-backed JWT validation against an OIDC issuer
//! - `static_tokens` - Fixed token table for local development
//! - `mock` - Test implementation that doesn't require external services

mod mock;
mod oidc;
mod static_tokens;

pub use mock::MockSessionValidator;
pub use oidc::{OidcConfig, OidcSessionValidator};
pub use static_tokens::StaticTokenValidator;
