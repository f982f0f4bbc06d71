//! Observability
//!
//! Library code only emits `tracing` events and spans. Installing a subscriber
//! is the application's call; [`init_tracing`] is an opt-in helper for
//! binaries and tests.

mod subscriber;

pub use subscriber::{OutputFormat, TracingConfig, init_tracing};

use crate::error::LlmError;
use crate::types::{ProviderId, Usage};
use reqwest::header::HeaderMap;
use std::time::Instant;
use tracing::{debug, error, info};

/// Mask a credential-like value, keeping a short prefix and suffix.
pub fn mask_sensitive_value(value: &str) -> String {
    fn ends(s: &str, head: usize, tail: usize) -> String {
        let chars: Vec<char> = s.chars().collect();
        let prefix: String = chars[..head].iter().collect();
        let suffix: String = chars[chars.len() - tail..].iter().collect();
        format!("{prefix}...{suffix}")
    }

    if let Some(token) = value.strip_prefix("Bearer ") {
        return if token.chars().count() > 8 {
            format!("Bearer {}", ends(token, 4, 4))
        } else {
            "Bearer ***".to_string()
        };
    }
    match value.chars().count() {
        n if n > 16 => ends(value, 6, 4),
        n if n > 8 => ends(value, 2, 2),
        _ => "***".to_string(),
    }
}

fn is_sensitive_header(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.contains("authorization") || name.contains("key") || name.contains("token")
}

/// Render headers as a JSON object with credentials masked.
pub fn format_headers_for_logging(headers: &HeaderMap) -> String {
    let map: std::collections::BTreeMap<&str, String> = headers
        .iter()
        .map(|(k, v)| {
            let value = v.to_str().unwrap_or("<invalid>");
            let shown = if v.is_sensitive() || is_sensitive_header(k.as_str()) {
                mask_sensitive_value(value)
            } else {
                value.to_string()
            };
            (k.as_str(), shown)
        })
        .collect();
    serde_json::to_string(&map).unwrap_or_else(|_| format!("{map:?}"))
}

/// Per-call request/response logging for one provider.
#[derive(Debug, Clone)]
pub struct ProviderTracer {
    provider: ProviderId,
    model: String,
}

impl ProviderTracer {
    pub fn new(provider: ProviderId, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn trace_request_start(&self, url: &str, attempt: u32) {
        debug!(
            provider = %self.provider,
            model = %self.model,
            url = %url,
            attempt,
            "request started"
        );
    }

    pub fn trace_request_details(&self, headers: &HeaderMap, body: &serde_json::Value) {
        debug!(
            provider = %self.provider,
            model = %self.model,
            request_headers = %format_headers_for_logging(headers),
            request_body_bytes = body.to_string().len(),
            "request details"
        );
    }

    pub fn trace_response_status(&self, status: u16, started: Instant) {
        debug!(
            provider = %self.provider,
            model = %self.model,
            status,
            duration_ms = started.elapsed().as_millis() as u64,
            "response received"
        );
    }

    pub fn trace_request_complete(&self, started: Instant, usage: Option<&Usage>) {
        info!(
            provider = %self.provider,
            model = %self.model,
            duration_ms = started.elapsed().as_millis() as u64,
            prompt_tokens = usage.and_then(|u| u.prompt_tokens),
            completion_tokens = usage.and_then(|u| u.completion_tokens),
            "request completed"
        );
    }

    pub fn trace_request_error(&self, error: &LlmError, started: Instant) {
        error!(
            provider = %self.provider,
            model = %self.model,
            kind = ?error.kind(),
            status = error.status_code(),
            duration_ms = started.elapsed().as_millis() as u64,
            error = %error,
            "request failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn masks_bearer_tokens_and_keys() {
        assert_eq!(
            mask_sensitive_value("Bearer sk-abcdefghijklmnop"),
            "Bearer sk-a...mnop"
        );
        assert_eq!(mask_sensitive_value("Bearer short"), "Bearer ***");
        assert_eq!(
            mask_sensitive_value("sk-ant-api03-0123456789"),
            "sk-ant...6789"
        );
        assert_eq!(mask_sensitive_value("tiny"), "***");
    }

    #[test]
    fn header_formatting_hides_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_static("Bearer sk-secret-value-123456"),
        );
        headers.insert("x-goog-api-key", HeaderValue::from_static("AIzaSyExampleKey0001"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let rendered = format_headers_for_logging(&headers);
        assert!(!rendered.contains("sk-secret-value-123456"));
        assert!(!rendered.contains("AIzaSyExampleKey0001"));
        assert!(rendered.contains("application/json"));
    }
}
