//! Errors raised while talking to a model server or preparing its input.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

/// Details of a 429 response.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitInfo {
    pub message: String,
    /// Server-requested wait from the `Retry-After` header.
    pub retry_after: Option<Duration>,
}

impl RateLimitInfo {
    pub fn new(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            message: message.into(),
            retry_after,
        }
    }

    /// Build from a response body message and the raw `Retry-After` value.
    /// Only the delay-seconds form of the header is understood.
    pub fn from_header(message: impl Into<String>, header: Option<&str>) -> Self {
        let retry_after = header
            .and_then(|h| h.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        Self::new(message, retry_after)
    }
}

impl std::fmt::Display for RateLimitInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.retry_after {
            Some(wait) => write!(f, "{} (retry in {}s)", self.message, wait.as_secs()),
            None => f.write_str(&self.message),
        }
    }
}

/// Failure of a generation, chat, tokenizer or template operation.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The server accepted the request but failed to serve it (5xx, bad body).
    #[error("Model server error: {0}")]
    Backend(String),

    /// Connect failure, timeout or dropped connection.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The server rejected the request (4xx other than auth and 429).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limited: {0}")]
    RateLimit(RateLimitInfo),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Chat template error: {0}")]
    Template(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LlmError {
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimit(RateLimitInfo::new(message, retry_after))
    }

    /// Wait requested by the server, for rate-limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit(info) => info.retry_after,
            _ => None,
        }
    }

    /// Transport failures and rate limits may be retried. A generation the
    /// server reports as failed is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimit(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "timed out"
        } else if err.is_connect() {
            "connect failed"
        } else {
            "request failed"
        };
        LlmError::Network(format!("{kind}: {err}"))
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Serialization(err.to_string())
    }
}

impl From<minijinja::Error> for LlmError {
    fn from(err: minijinja::Error) -> Self {
        LlmError::Template(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_and_rate_limit_retry() {
        assert!(LlmError::Network("reset".into()).is_retryable());
        assert!(LlmError::rate_limit("slow down", None).is_retryable());

        for err in [
            LlmError::Backend("CUDA out of memory".into()),
            LlmError::InvalidRequest("max_tokens must be positive".into()),
            LlmError::Auth("bad key".into()),
            LlmError::Tokenizer("missing".into()),
        ] {
            assert!(!err.is_retryable(), "{err} should be final");
        }
    }

    #[test]
    fn test_retry_after_header() {
        let info = RateLimitInfo::from_header("slow down", Some(" 7 "));
        assert_eq!(info.retry_after, Some(Duration::from_secs(7)));
        assert_eq!(info.to_string(), "slow down (retry in 7s)");

        let info = RateLimitInfo::from_header("slow down", Some("Wed, 21 Oct 2026 07:28:00 GMT"));
        assert_eq!(info.retry_after, None);
        assert_eq!(info.to_string(), "slow down");

        let err = LlmError::RateLimit(RateLimitInfo::from_header("x", Some("2")));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(LlmError::Network("x".into()).retry_after(), None);
    }
}
