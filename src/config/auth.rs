//! Authentication configuration

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// How bearer tokens are validated
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Oidc,
    Static,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,

    /// OIDC issuer URL, also used for JWKS discovery
    #[serde(default)]
    pub issuer: String,

    /// Expected audience for tokens
    #[serde(default)]
    pub audience: String,

    /// Explicit JWKS URL, defaults to `{issuer}/.well-known/jwks.json`
    pub jwks_url: Option<String>,

    /// JWKS cache TTL in seconds
    #[serde(default = "default_jwks_cache_ttl")]
    pub jwks_cache_ttl_secs: u64,

    /// Development token table: token → user id
    #[serde(default)]
    pub static_tokens: HashMap<String, String>,
}

impl AuthConfig {
    /// Get JWKS cache TTL as Duration
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_secs)
    }

    /// Validate authentication configuration
    ///
    /// In production, requires HTTPS for the issuer and forbids the static
    /// token table.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        match self.mode {
            AuthMode::Oidc => {
                if self.issuer.is_empty() {
                    return Err(ValidationError::MissingRequired("AUTH__ISSUER"));
                }
                if self.audience.is_empty() {
                    return Err(ValidationError::MissingRequired("AUTH__AUDIENCE"));
                }
                if *environment == Environment::Production && !self.issuer.starts_with("https://")
                {
                    return Err(ValidationError::IssuerMustBeHttps);
                }
            }
            AuthMode::Static => {
                if *environment == Environment::Production {
                    return Err(ValidationError::StaticTokensInProduction);
                }
                if self.static_tokens.is_empty() {
                    return Err(ValidationError::MissingRequired("AUTH__STATIC_TOKENS"));
                }
            }
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::Oidc,
            issuer: String::new(),
            audience: String::new(),
            jwks_url: None,
            jwks_cache_ttl_secs: default_jwks_cache_ttl(),
            static_tokens: HashMap::new(),
        }
    }
}

fn default_jwks_cache_ttl() -> u64 {
    3600
}
