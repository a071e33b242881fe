//! Errors shared by both upstream transports.

/// Upstream provider errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Rate limited by provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    /// API key or authentication failed.
    #[error("provider authentication failed")]
    AuthenticationFailed,

    /// Requested thread, run or instance does not exist upstream.
    #[error("not found: {0}")]
    NotFound(String),

    /// Provider returned a 5xx or is otherwise unavailable.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Provider rejected the request (4xx other than the above).
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

impl ProviderError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Maps a non-success HTTP status and body to an error.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => ProviderError::AuthenticationFailed,
            404 => ProviderError::NotFound(body),
            429 => ProviderError::RateLimited {
                retry_after_secs: 30,
            },
            500..=599 => ProviderError::Unavailable(format!("server error {}: {}", status, body)),
            _ => ProviderError::Rejected {
                status,
                message: body,
            },
        }
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. }
                | ProviderError::Unavailable(_)
                | ProviderError::Network(_)
                | ProviderError::Timeout { .. }
        )
    }

    /// Whether the backend instance is at fault and its health should pay.
    ///
    /// Rejections of the request itself (unknown thread, bad input) say
    /// nothing about the instance.
    pub fn counts_against_instance(&self) -> bool {
        self.is_retryable()
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout { timeout_secs: 0 }
        } else if err.is_decode() {
            ProviderError::parse(err.to_string())
        } else if err.is_connect() {
            ProviderError::network(format!("connection failed: {}", err))
        } else {
            ProviderError::network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_http_statuses() {
        assert_eq!(
            ProviderError::from_status(401, ""),
            ProviderError::AuthenticationFailed
        );
        assert!(matches!(
            ProviderError::from_status(404, "no thread"),
            ProviderError::NotFound(_)
        ));
        assert!(matches!(
            ProviderError::from_status(429, ""),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            ProviderError::from_status(503, "down"),
            ProviderError::Unavailable(_)
        ));
        assert!(matches!(
            ProviderError::from_status(400, "bad"),
            ProviderError::Rejected { status: 400, .. }
        ));
    }

    #[test]
    fn retryable_classification() {
        assert!(ProviderError::unavailable("down").is_retryable());
        assert!(ProviderError::network("reset").is_retryable());
        assert!(ProviderError::Timeout { timeout_secs: 30 }.is_retryable());
        assert!(!ProviderError::AuthenticationFailed.is_retryable());
        assert!(!ProviderError::parse("bad json").is_retryable());
    }

    #[test]
    fn only_backend_faults_count_against_instance() {
        assert!(ProviderError::from_status(502, "bad gateway").counts_against_instance());
        assert!(ProviderError::Timeout { timeout_secs: 30 }.counts_against_instance());
        assert!(ProviderError::network("reset").counts_against_instance());
        assert!(!ProviderError::from_status(404, "no thread").counts_against_instance());
        assert!(!ProviderError::from_status(400, "bad").counts_against_instance());
        assert!(!ProviderError::from_status(422, "invalid").counts_against_instance());
    }

    #[test]
    fn displays_correctly() {
        let err = ProviderError::Rejected {
            status: 400,
            message: "bad".to_string(),
        };
        assert_eq!(err.to_string(), "request rejected (400): bad");
    }
}
