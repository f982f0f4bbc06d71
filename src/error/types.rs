//! Core error types.

use std::time::Duration;
use thiserror::Error;

/// Coarse error kind, one per taxonomy variant.
///
/// Useful when matching on the class of failure without destructuring
/// the variant fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    RateLimit,
    InvalidRequest,
    Timeout,
    UnknownProvider,
    Provider,
}

/// Unified error type returned by every provider.
///
/// Each variant carries the provider identifier, an optional HTTP status,
/// a human-readable message and, when available, the raw provider body or
/// transport cause in `details`. Callers are expected to branch on the
/// variant, never on `details`.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// Missing credential, or the provider rejected the credential.
    #[error("Authentication error ({provider}): {message}")]
    AuthenticationError {
        provider: String,
        status: Option<u16>,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The provider is throttling requests.
    #[error("Rate limit exceeded ({provider}): {message}")]
    RateLimitError {
        provider: String,
        status: Option<u16>,
        message: String,
        /// Server-provided hint from the `Retry-After` header
        retry_after: Option<Duration>,
        details: Option<serde_json::Value>,
    },

    /// Malformed request, bad parameter or a model the provider does not serve.
    #[error("Invalid request ({provider}): {message}")]
    InvalidRequestError {
        provider: String,
        status: Option<u16>,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Every attempt exceeded the per-call time budget.
    #[error("Request timed out ({provider}) after {attempts} attempt(s): {message}")]
    TimeoutError {
        provider: String,
        status: Option<u16>,
        message: String,
        attempts: u32,
        details: Option<serde_json::Value>,
    },

    /// Provider identifier outside the supported set.
    #[error("Unknown provider: {provider}")]
    UnknownProviderError {
        provider: String,
        status: Option<u16>,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Any other provider or transport failure.
    #[error("Provider error ({provider}): {message}")]
    ProviderError {
        provider: String,
        status: Option<u16>,
        message: String,
        details: Option<serde_json::Value>,
    },
}

impl LlmError {
    pub fn authentication(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AuthenticationError {
            provider: provider.into(),
            status: None,
            message: message.into(),
            details: None,
        }
    }

    pub fn rate_limit(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimitError {
            provider: provider.into(),
            status: None,
            message: message.into(),
            retry_after: None,
            details: None,
        }
    }

    pub fn invalid_request(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequestError {
            provider: provider.into(),
            status: None,
            message: message.into(),
            details: None,
        }
    }

    pub fn timeout(provider: impl Into<String>, message: impl Into<String>, attempts: u32) -> Self {
        Self::TimeoutError {
            provider: provider.into(),
            status: None,
            message: message.into(),
            attempts,
            details: None,
        }
    }

    pub fn unknown_provider(provider: impl Into<String>) -> Self {
        let provider = provider.into();
        let message = format!(
            "'{provider}' is not a supported provider (expected one of: openai, anthropic, gemini, xai, openrouter)"
        );
        Self::UnknownProviderError {
            provider,
            status: None,
            message,
            details: None,
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.into(),
            status: None,
            message: message.into(),
            details: None,
        }
    }

    /// Attach an HTTP status code.
    pub fn with_status(mut self, code: u16) -> Self {
        match &mut self {
            Self::AuthenticationError { status, .. }
            | Self::RateLimitError { status, .. }
            | Self::InvalidRequestError { status, .. }
            | Self::TimeoutError { status, .. }
            | Self::UnknownProviderError { status, .. }
            | Self::ProviderError { status, .. } => *status = Some(code),
        }
        self
    }

    /// Attach the raw provider body (or transport cause) for diagnostics.
    pub fn with_details(mut self, value: serde_json::Value) -> Self {
        match &mut self {
            Self::AuthenticationError { details, .. }
            | Self::RateLimitError { details, .. }
            | Self::InvalidRequestError { details, .. }
            | Self::TimeoutError { details, .. }
            | Self::UnknownProviderError { details, .. }
            | Self::ProviderError { details, .. } => *details = Some(value),
        }
        self
    }

    /// Attach a `Retry-After` hint. No-op for non rate-limit variants.
    pub fn with_retry_after(mut self, hint: Option<Duration>) -> Self {
        if let Self::RateLimitError { retry_after, .. } = &mut self {
            *retry_after = hint;
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthenticationError { .. } => ErrorKind::Authentication,
            Self::RateLimitError { .. } => ErrorKind::RateLimit,
            Self::InvalidRequestError { .. } => ErrorKind::InvalidRequest,
            Self::TimeoutError { .. } => ErrorKind::Timeout,
            Self::UnknownProviderError { .. } => ErrorKind::UnknownProvider,
            Self::ProviderError { .. } => ErrorKind::Provider,
        }
    }

    pub fn provider_id(&self) -> &str {
        match self {
            Self::AuthenticationError { provider, .. }
            | Self::RateLimitError { provider, .. }
            | Self::InvalidRequestError { provider, .. }
            | Self::TimeoutError { provider, .. }
            | Self::UnknownProviderError { provider, .. }
            | Self::ProviderError { provider, .. } => provider,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::AuthenticationError { status, .. }
            | Self::RateLimitError { status, .. }
            | Self::InvalidRequestError { status, .. }
            | Self::TimeoutError { status, .. }
            | Self::UnknownProviderError { status, .. }
            | Self::ProviderError { status, .. } => *status,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::AuthenticationError { message, .. }
            | Self::RateLimitError { message, .. }
            | Self::InvalidRequestError { message, .. }
            | Self::TimeoutError { message, .. }
            | Self::UnknownProviderError { message, .. }
            | Self::ProviderError { message, .. } => message,
        }
    }

    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            Self::AuthenticationError { details, .. }
            | Self::RateLimitError { details, .. }
            | Self::InvalidRequestError { details, .. }
            | Self::TimeoutError { details, .. }
            | Self::UnknownProviderError { details, .. }
            | Self::ProviderError { details, .. } => details.as_ref(),
        }
    }

    /// Only throttling is retried automatically; every other kind surfaces
    /// on first occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitError { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitError { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rate_limit_is_retryable() {
        assert!(LlmError::rate_limit("openai", "slow down").is_retryable());
        assert!(!LlmError::authentication("openai", "bad key").is_retryable());
        assert!(!LlmError::invalid_request("openai", "bad").is_retryable());
        assert!(!LlmError::timeout("openai", "late", 3).is_retryable());
        assert!(!LlmError::unknown_provider("nope").is_retryable());
        assert!(!LlmError::provider("openai", "boom").is_retryable());
    }

    #[test]
    fn builders_attach_status_and_details() {
        let err = LlmError::provider("anthropic", "overloaded")
            .with_status(529)
            .with_details(serde_json::json!({"type": "error"}));
        assert_eq!(err.status_code(), Some(529));
        assert_eq!(err.provider_id(), "anthropic");
        assert_eq!(err.kind(), ErrorKind::Provider);
        assert_eq!(err.details().unwrap()["type"], "error");
    }

    #[test]
    fn retry_after_only_sticks_to_rate_limit() {
        let hint = Some(Duration::from_secs(2));
        let rl = LlmError::rate_limit("xai", "429").with_retry_after(hint);
        assert_eq!(rl.retry_after(), hint);
        let auth = LlmError::authentication("xai", "401").with_retry_after(hint);
        assert_eq!(auth.retry_after(), None);
    }

    #[test]
    fn display_names_the_provider() {
        let err = LlmError::unknown_provider("does-not-exist");
        assert_eq!(err.to_string(), "Unknown provider: does-not-exist");
        let err = LlmError::timeout("gemini", "deadline exceeded", 3);
        assert!(err.to_string().contains("after 3 attempt(s)"));
    }
}
