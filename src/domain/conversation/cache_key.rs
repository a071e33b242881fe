//! Cache key for per-user, per-agent conversation handles.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{AgentId, UserId};

/// Deterministic key identifying one (user, logical agent) conversation.
///
/// The user id is length-prefixed so that ids containing the separator can
/// never collide: `("a:b", "c")` and `("a", "b:c")` map to different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for a user talking to a logical agent.
    pub fn new(user_id: &UserId, agent_id: &AgentId) -> Self {
        let user = user_id.as_str();
        Self(format!("{}:{}:{}", user.len(), user, agent_id.as_str()))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(user: &str, agent: &str) -> CacheKey {
        CacheKey::new(&UserId::new(user).unwrap(), &AgentId::new(agent).unwrap())
    }

    #[test]
    fn same_pair_yields_same_key() {
        assert_eq!(key("user-1", "cdspro"), key("user-1", "cdspro"));
    }

    #[test]
    fn separator_in_user_id_does_not_collide() {
        assert_ne!(key("a:b", "c"), key("a", "b:c"));
    }

    #[test]
    fn agent_case_is_irrelevant() {
        assert_eq!(key("user-1", "CDSPRO"), key("user-1", "cdspro"));
    }

    proptest! {
        #[test]
        fn distinct_pairs_never_collide(
            u1 in "[a-z0-9:|_-]{1,12}",
            a1 in "[a-z0-9:_-]{1,8}",
            u2 in "[a-z0-9:|_-]{1,12}",
            a2 in "[a-z0-9:_-]{1,8}",
        ) {
            prop_assume!((u1.as_str(), a1.as_str()) != (u2.as_str(), a2.as_str()));
            prop_assert_ne!(key(&u1, &a1), key(&u2, &a2));
        }

        #[test]
        fn key_is_deterministic(u in "[a-zA-Z0-9@._-]{1,20}", a in "[a-z0-9_-]{1,10}") {
            prop_assert_eq!(key(&u, &a), key(&u, &a));
        }
    }
}
