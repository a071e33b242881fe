//! OIDC adapter for JWT validation.
//!
//! Implements the `SessionValidator` port against any OIDC identity
//! provider that publishes a JWKS document. Validation:
//!
//! 1. Fetch JWKS (cached, refetched after the TTL or on an unknown `kid`)
//! 2. Verify the JWT signature against the matching public key
//! 3. Check issuer, audience and expiry
//! 4. Map claims to the domain `AuthenticatedUser`

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{
    decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, TokenData, Validation,
};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Configuration for the OIDC adapter.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Issuer URL, matched exactly against the `iss` claim.
    pub issuer_url: String,

    /// Audience that tokens must carry.
    pub audience: String,

    /// Explicit JWKS location; derived from the issuer when unset.
    pub jwks_url: Option<String>,

    /// How long to cache JWKS before refetching.
    pub jwks_cache_duration: Duration,
}

impl OidcConfig {
    pub fn new(issuer_url: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer_url: issuer_url.into(),
            audience: audience.into(),
            jwks_url: None,
            jwks_cache_duration: Duration::from_secs(3600),
        }
    }

    pub fn with_jwks_url(mut self, url: Option<String>) -> Self {
        self.jwks_url = url;
        self
    }

    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.jwks_cache_duration = duration;
        self
    }

    fn jwks_url(&self) -> String {
        self.jwks_url.clone().unwrap_or_else(|| {
            format!(
                "{}/.well-known/jwks.json",
                self.issuer_url.trim_end_matches('/')
            )
        })
    }
}

#[derive(Debug, Deserialize)]
struct OidcClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
}

struct JwksCache {
    jwks: JwkSet,
    fetched_at: Instant,
}

impl JwksCache {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() > ttl
    }
}

/// OIDC session validator.
pub struct OidcSessionValidator {
    config: OidcConfig,
    http_client: reqwest::Client,
    jwks_cache: Arc<RwLock<Option<JwksCache>>>,
}

impl OidcSessionValidator {
    /// Keys are fetched lazily on first validation.
    pub fn new(config: OidcConfig) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::service_unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            jwks_cache: Arc::new(RwLock::new(None)),
        })
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let url = self.config.jwks_url();
        tracing::debug!(%url, "fetching JWKS");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            tracing::error!(error = %e, "failed to fetch JWKS");
            AuthError::service_unavailable(format!("Failed to fetch JWKS: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(%status, "JWKS endpoint returned an error");
            return Err(AuthError::service_unavailable(format!(
                "JWKS endpoint returned {}",
                status
            )));
        }

        let jwks: JwkSet = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse JWKS");
            AuthError::service_unavailable(format!("Failed to parse JWKS: {}", e))
        })?;

        tracing::debug!(keys = jwks.keys.len(), "fetched JWKS");
        Ok(jwks)
    }

    async fn get_jwks(&self, force_refresh: bool) -> Result<JwkSet, AuthError> {
        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if !cached.is_expired(self.config.jwks_cache_duration) {
                    return Ok(cached.jwks.clone());
                }
            }
        }

        let jwks = self.fetch_jwks().await?;
        *self.jwks_cache.write().await = Some(JwksCache {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
        });
        Ok(jwks)
    }

    fn decoding_key(kid: &str, jwks: &JwkSet) -> Option<Result<(DecodingKey, Algorithm), AuthError>> {
        let jwk = jwks.find(kid)?;

        let algorithm = match jwk.common.key_algorithm {
            Some(jsonwebtoken::jwk::KeyAlgorithm::RS256) | None => Algorithm::RS256,
            Some(jsonwebtoken::jwk::KeyAlgorithm::RS384) => Algorithm::RS384,
            Some(jsonwebtoken::jwk::KeyAlgorithm::RS512) => Algorithm::RS512,
            Some(jsonwebtoken::jwk::KeyAlgorithm::ES256) => Algorithm::ES256,
            Some(jsonwebtoken::jwk::KeyAlgorithm::ES384) => Algorithm::ES384,
            Some(other) => {
                tracing::warn!(algorithm = ?other, "unsupported JWK algorithm");
                return Some(Err(AuthError::InvalidToken));
            }
        };

        Some(
            DecodingKey::from_jwk(jwk)
                .map(|key| (key, algorithm))
                .map_err(|e| {
                    tracing::warn!(error = %e, "failed to build decoding key");
                    AuthError::InvalidToken
                }),
        )
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&self.config.issuer_url]);
        validation.set_audience(&[&self.config.audience]);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iss", "sub", "aud"]);
        validation
    }

    fn decode_claims(
        &self,
        token: &str,
        key: &DecodingKey,
        algorithm: Algorithm,
    ) -> Result<TokenData<OidcClaims>, AuthError> {
        decode::<OidcClaims>(token, key, &self.validation(algorithm)).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::debug!(error = %e, "token validation failed");
                    AuthError::InvalidToken
                }
            }
        })
    }
}

#[async_trait]
impl SessionValidator for OidcSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        let kid = header.kid.ok_or(AuthError::InvalidToken)?;

        // Unknown kid usually means the provider rotated keys
        let jwks = self.get_jwks(false).await?;
        let found = match Self::decoding_key(&kid, &jwks) {
            Some(found) => found,
            None => Self::decoding_key(&kid, &self.get_jwks(true).await?).ok_or_else(|| {
                tracing::warn!(%kid, "no JWK matches token kid");
                AuthError::InvalidToken
            })?,
        };
        let (key, algorithm) = found?;

        let claims = self.decode_claims(token, &key, algorithm)?.claims;
        let user_id = UserId::new(claims.sub).map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthenticatedUser::new(
            user_id,
            claims.email,
            claims.name.or(claims.preferred_username),
        ))
    }
}

impl std::fmt::Debug for OidcSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcSessionValidator")
            .field("issuer_url", &self.config.issuer_url)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_builds_jwks_url_from_issuer() {
        let config = OidcConfig::new("https://auth.example.com/", "agent-gateway");
        assert_eq!(
            config.jwks_url(),
            "https://auth.example.com/.well-known/jwks.json"
        );
    }

    #[test]
    fn explicit_jwks_url_wins() {
        let config = OidcConfig::new("https://auth.example.com", "agent-gateway")
            .with_jwks_url(Some("https://keys.example.com/jwks".to_string()));
        assert_eq!(config.jwks_url(), "https://keys.example.com/jwks");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Validation Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn jwks_cache_expiry() {
        let cache = JwksCache {
            jwks: JwkSet { keys: vec![] },
            fetched_at: Instant::now(),
        };
        assert!(!cache.is_expired(Duration::from_secs(3600)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.is_expired(Duration::from_millis(1)));
    }

    #[test]
    fn unknown_kid_has_no_key() {
        let jwks = JwkSet { keys: vec![] };
        assert!(OidcSessionValidator::decoding_key("missing", &jwks).is_none());
    }

    #[tokio::test]
    async fn garbage_token_is_invalid_without_network() {
        let validator =
            OidcSessionValidator::new(OidcConfig::new("https://auth.example.com", "aud")).unwrap();
        let result = validator.validate("not-a-jwt").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn oidc_validator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OidcSessionValidator>();
    }
}
