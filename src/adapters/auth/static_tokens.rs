//! Fixed token table for local development.
//!
//! Refused by configuration validation in production.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Validates bearer tokens against a configured token → user id table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenValidator {
    /// Builds the table, skipping entries with an empty user id.
    pub fn from_table(table: &HashMap<String, String>) -> Self {
        let tokens = table
            .iter()
            .filter_map(|(token, user)| match UserId::new(user.clone()) {
                Ok(id) => Some((token.clone(), id)),
                Err(_) => {
                    tracing::warn!("ignoring static token with empty user id");
                    None
                }
            })
            .collect();
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl SessionValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        self.tokens
            .get(token)
            .map(|id| AuthenticatedUser::new(id.clone(), None, None))
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> HashMap<String, String> {
        HashMap::from([
            ("dev-alice".to_string(), "alice".to_string()),
            ("dev-empty".to_string(), String::new()),
        ])
    }

    #[tokio::test]
    async fn known_token_maps_to_user() {
        let validator = StaticTokenValidator::from_table(&table());
        let user = validator.validate("dev-alice").await.unwrap();
        assert_eq!(user.id.as_str(), "alice");
        assert_eq!(user.label(), "alice");
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let validator = StaticTokenValidator::from_table(&table());
        assert!(matches!(
            validator.validate("nope").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn empty_user_ids_are_dropped() {
        let validator = StaticTokenValidator::from_table(&table());
        assert_eq!(validator.len(), 1);
    }
}
