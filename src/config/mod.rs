//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `AGENT_GATEWAY` prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use agent_gateway::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr().unwrap());
//! ```

mod agents;
mod auth;
mod cache;
mod error;
mod provider;
mod routing;
mod server;

pub use agents::AgentsConfig;
pub use auth::{AuthConfig, AuthMode};
pub use cache::{CacheBackend, CacheConfig};
pub use error::{ConfigError, ValidationError};
pub use provider::ProviderConfig;
pub use routing::RoutingConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream provider (base URL, default key, timeouts)
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Logical agent → backend instance routing and poll budgets
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Conversation cache backend and timings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Bearer token validation
    #[serde(default)]
    pub auth: AuthConfig,

    /// Static agent settings
    #[serde(default)]
    pub agents: AgentsConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `AGENT_GATEWAY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `AGENT_GATEWAY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `AGENT_GATEWAY__ROUTING__ROUTES__RESEARCH=asst_123` -> `routing.routes["research"]`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("AGENT_GATEWAY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.provider.validate()?;
        self.routing.validate()?;
        self.cache.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.agents.validate()?;
        Ok(())
    }
}
