//! Anthropic Messages API adapter.

use super::{
    ProviderAdapter, ProviderContext, ProviderRequest, Range, f32_value, insert_header, join_url,
    merge_extras, secret_header, u32_field, validate_params,
};
use crate::error::{LlmError, Result, classify_http_status, error_details, retry_after};
use crate::types::{FinishReason, GenParams, GenResponse, Prompt, ProviderId, Usage};
use reqwest::header::HeaderMap;
use secrecy::ExposeSecret;
use serde_json::{Value, json};

pub const DEFAULT_API_VERSION: &str = "2023-06-01";
/// Messages API requires `max_tokens`; used when the caller sets none.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

const RESERVED_KEYS: &[&str] = &["model", "messages", "system", "stream"];
const HEADER_FLAGS: &[&str] = &["anthropic_version", "anthropic_beta"];

#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicAdapter;

fn stop_reason(raw: &str) -> FinishReason {
    match raw {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        "refusal" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}

/// Map an Anthropic `{type:"error", error:{type, message}}` body.
fn map_error(status: u16, error_type: &str, message: &str) -> LlmError {
    let id = ProviderId::Anthropic.as_str();
    match error_type {
        "authentication_error" => LlmError::authentication(id, message),
        "permission_error" => LlmError::authentication(id, format!("Permission denied: {message}")),
        // Overload is transient; it shares the throttling retry path.
        "rate_limit_error" | "overloaded_error" => LlmError::rate_limit(id, message),
        "invalid_request_error" | "not_found_error" => LlmError::invalid_request(id, message),
        "request_too_large" => LlmError::invalid_request(id, format!("Request too large: {message}")),
        _ if status == 529 => LlmError::rate_limit(id, message),
        other => LlmError::provider(id, format!("{message} ({other})")),
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn build_request(
        &self,
        ctx: &ProviderContext,
        prompt: &Prompt,
        params: &GenParams,
    ) -> Result<ProviderRequest> {
        validate_params(
            self.id(),
            ctx,
            params,
            Range {
                field: "temperature",
                min: 0.0,
                max: 1.0,
            },
        )?;

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", secret_header(self.id(), ctx.api_key.expose_secret())?);
        let version = ctx
            .extra_str("anthropic_version")
            .unwrap_or(DEFAULT_API_VERSION);
        insert_header(self.id(), &mut headers, "anthropic-version", version)?;
        if let Some(beta) = ctx.extra_str("anthropic_beta") {
            insert_header(self.id(), &mut headers, "anthropic-beta", beta)?;
        }

        let mut body = json!({
            "model": ctx.model,
            "messages": [{"role": "user", "content": prompt.input}],
            "max_tokens": params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });
        if prompt.has_instructions() {
            body["system"] = json!(prompt.instructions);
        }
        if let Some(t) = params.temperature {
            body["temperature"] = f32_value(t);
        }
        if let Some(p) = params.top_p {
            body["top_p"] = f32_value(p);
        }
        if let Some(stop) = params.stop_sequences.as_ref().filter(|s| !s.is_empty()) {
            body["stop_sequences"] = json!(stop);
        }
        merge_extras(&mut body, &[&ctx.extra, &params.extra], RESERVED_KEYS, HEADER_FLAGS);

        Ok(ProviderRequest {
            url: join_url(&ctx.base_url, "messages"),
            headers,
            body,
        })
    }

    fn parse_response(&self, ctx: &ProviderContext, body: &Value) -> Result<GenResponse> {
        if let Some(err) = self.embedded_error(body) {
            return Err(err);
        }

        let text: String = body
            .get("content")
            .and_then(|c| c.as_array())
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        let mut response = GenResponse::new(self.id(), ctx.model.clone(), text);
        response.usage = body.get("usage").and_then(|u| {
            let input = u32_field(u, "input_tokens");
            let output = u32_field(u, "output_tokens");
            let total = input.zip(output).map(|(i, o)| i.saturating_add(o));
            Usage::from_counts(input, output, total)
        });
        response.finish_reason = body
            .get("stop_reason")
            .and_then(|r| r.as_str())
            .map(stop_reason);
        response.served_model = body
            .get("model")
            .and_then(|m| m.as_str())
            .map(str::to_string);
        Ok(response)
    }

    /// `{type:"error"}` delivered with a success status.
    fn embedded_error(&self, body: &Value) -> Option<LlmError> {
        (body.get("type").and_then(|t| t.as_str()) == Some("error"))
            .then(|| self.parse_error(200, &HeaderMap::new(), &body.to_string()))
    }

    fn parse_error(&self, status: u16, headers: &HeaderMap, body: &str) -> LlmError {
        let parsed = serde_json::from_str::<Value>(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));
        let Some(error_type) = error.and_then(|e| e.get("type")).and_then(|t| t.as_str()) else {
            return match status {
                529 => LlmError::rate_limit(self.id().as_str(), "Overloaded")
                    .with_status(status)
                    .with_details(error_details(status, body, headers)),
                _ => classify_http_status(self.id().as_str(), status, body, headers),
            };
        };
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error");

        map_error(status, error_type, message)
            .with_retry_after(retry_after(headers))
            .with_status(status)
            .with_details(error_details(status, body, headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_context;
    use crate::error::ErrorKind;

    fn ctx() -> ProviderContext {
        test_context(ProviderId::Anthropic, "claude-sonnet-4-5")
    }

    #[test]
    fn request_shape() {
        let request = AnthropicAdapter
            .build_request(&ctx(), &Prompt::new("Be terse.", "2+2?"), &GenParams::new())
            .unwrap();
        assert_eq!(request.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(request.headers["x-api-key"], "test-key");
        assert_eq!(request.headers["anthropic-version"], DEFAULT_API_VERSION);
        assert!(request.headers.get("authorization").is_none());
        assert_eq!(request.body["system"], "Be terse.");
        assert_eq!(request.body["messages"][0]["content"], "2+2?");
        assert_eq!(request.body["max_tokens"], DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn caller_max_tokens_and_extras_override_default() {
        let params = GenParams::new().with_max_tokens(10);
        let body = AnthropicAdapter
            .build_request(&ctx(), &Prompt::input("hi"), &params)
            .unwrap()
            .body;
        assert_eq!(body["max_tokens"], 10);
        assert!(body.get("system").is_none());

        let params = GenParams::new().with_extra("max_tokens", 20);
        let body = AnthropicAdapter
            .build_request(&ctx(), &Prompt::input("hi"), &params)
            .unwrap()
            .body;
        assert_eq!(body["max_tokens"], 20);
    }

    #[test]
    fn version_and_beta_flags_become_headers() {
        let mut ctx = ctx();
        ctx.extra.insert("anthropic_version".into(), "2024-01-01".into());
        ctx.extra.insert("anthropic_beta".into(), "prompt-caching-2024-07-31".into());
        let request = AnthropicAdapter
            .build_request(&ctx, &Prompt::input("hi"), &GenParams::new())
            .unwrap();
        assert_eq!(request.headers["anthropic-version"], "2024-01-01");
        assert_eq!(request.headers["anthropic-beta"], "prompt-caching-2024-07-31");
        assert!(request.body.get("anthropic_beta").is_none());
    }

    #[test]
    fn temperature_range_is_zero_to_one() {
        let err = AnthropicAdapter
            .build_request(&ctx(), &Prompt::input("hi"), &GenParams::new().with_temperature(1.5))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn joins_text_blocks_and_derives_total() {
        let body = json!({
            "model": "claude-sonnet-4-5-20250929",
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Hello"},
                {"type": "text", "text": " there"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 3}
        });
        let response = AnthropicAdapter.parse_response(&ctx(), &body).unwrap();
        assert_eq!(response.text, "Hello there");
        assert_eq!(response.usage, Some(Usage::new(12, 3, 15)));
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.model, "claude-sonnet-4-5");
    }

    #[test]
    fn total_not_derived_from_one_counter() {
        let body = json!({"content": [], "usage": {"input_tokens": 12}});
        let usage = AnthropicAdapter.parse_response(&ctx(), &body).unwrap().usage.unwrap();
        assert_eq!(usage.total_tokens, None);
        assert_eq!(usage.completion_tokens, None);
    }

    #[test]
    fn error_types_map_onto_taxonomy() {
        let cases = [
            (401, "authentication_error", ErrorKind::Authentication),
            (403, "permission_error", ErrorKind::Authentication),
            (429, "rate_limit_error", ErrorKind::RateLimit),
            (529, "overloaded_error", ErrorKind::RateLimit),
            (400, "invalid_request_error", ErrorKind::InvalidRequest),
            (404, "not_found_error", ErrorKind::InvalidRequest),
            (413, "request_too_large", ErrorKind::InvalidRequest),
            (500, "api_error", ErrorKind::Provider),
        ];
        for (status, error_type, kind) in cases {
            let body = format!(r#"{{"type":"error","error":{{"type":"{error_type}","message":"m"}}}}"#);
            let err = AnthropicAdapter.parse_error(status, &HeaderMap::new(), &body);
            assert_eq!(err.kind(), kind, "{error_type}");
            assert_eq!(err.status_code(), Some(status));
        }
    }

    #[test]
    fn unstructured_error_falls_back_to_status() {
        let err = AnthropicAdapter.parse_error(401, &HeaderMap::new(), "unauthorized");
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn error_event_with_success_status_is_retryable_overload() {
        let body = json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}});
        let err = AnthropicAdapter.embedded_error(&body).unwrap();
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert!(AnthropicAdapter.embedded_error(&json!({"type": "message", "content": []})).is_none());
    }
}
