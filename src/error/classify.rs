//! Provider-agnostic HTTP failure classification.
//!
//! Adapters try their own error envelope first and fall back to
//! [`classify_http_status`] when the body is not recognizable.

use super::LlmError;
use reqwest::header::HeaderMap;
use std::time::Duration;

/// Header names that commonly carry request/trace ids.
const REQUEST_ID_HEADERS: &[&str] = &[
    "x-request-id",
    "request-id",
    "x-openai-request-id",
    "x-goog-request-id",
    "cf-ray",
];

/// Classify a failure by status code alone.
///
/// The raw body is kept in `details` (as JSON when it parses, as text
/// otherwise) so nothing the provider said is lost.
pub fn classify_http_status(
    provider_id: &str,
    status: u16,
    body_text: &str,
    headers: &HeaderMap,
) -> LlmError {
    let body_sample: String = body_text.chars().take(200).collect();
    let message = if body_sample.trim().is_empty() {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("api error")
            .to_string()
    } else {
        body_sample
    };

    let err = match status {
        401 | 403 => LlmError::authentication(provider_id, message),
        429 => LlmError::rate_limit(provider_id, message).with_retry_after(retry_after(headers)),
        400 | 404 | 413 | 415 | 422 => LlmError::invalid_request(provider_id, message),
        _ => LlmError::provider(provider_id, message),
    };
    err.with_status(status)
        .with_details(error_details(status, body_text, headers))
}

/// Structured diagnostics attached to classified errors.
pub fn error_details(status: u16, body_text: &str, headers: &HeaderMap) -> serde_json::Value {
    let request_ids: Vec<String> = REQUEST_ID_HEADERS
        .iter()
        .filter_map(|k| {
            headers
                .get(*k)
                .and_then(|v| v.to_str().ok())
                .map(|v| format!("{k}={v}"))
        })
        .collect();
    match serde_json::from_str::<serde_json::Value>(body_text) {
        Ok(json) => serde_json::json!({
            "status": status,
            "response": json,
            "request_ids": request_ids,
        }),
        Err(_) => serde_json::json!({
            "status": status,
            "raw": body_text,
            "request_ids": request_ids,
        }),
    }
}

/// Parse a `Retry-After` header given in delta-seconds.
///
/// HTTP-date values, and values too large for a `Duration`, are ignored; the
/// retry policy's own backoff applies then.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get("retry-after")?.to_str().ok()?.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}
