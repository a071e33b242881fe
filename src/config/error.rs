//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid host address: {0}")]
    InvalidHost(String),

    #[error("Invalid provider base URL")]
    InvalidBaseUrl,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Invalid poll budget: {0}")]
    InvalidPollBudget(&'static str),

    #[error("Invalid cache timing: {0}")]
    InvalidCacheTiming(&'static str),

    #[error("Invalid agent id: {0}")]
    InvalidAgentId(String),

    #[error("Invalid instance id for agent {0}")]
    InvalidInstanceId(String),

    #[error("Auth issuer must use HTTPS in production")]
    IssuerMustBeHttps,

    #[error("Static tokens are not allowed in production")]
    StaticTokensInProduction,

    #[error("Temperature for agent {0} must be between 0 and 2")]
    InvalidTemperature(String),
}
