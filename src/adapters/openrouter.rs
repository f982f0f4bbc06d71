//! OpenRouter adapter.
//!
//! OpenRouter proxies many upstream models behind the Chat Completions schema,
//! so the payload is forwarded as-is: no model-specific parameter rewriting.

use super::chat_completions::{self, PATH};
use super::{
    ProviderAdapter, ProviderContext, ProviderRequest, Range, insert_header, join_url,
    validate_params,
};
use crate::error::{LlmError, Result};
use crate::types::{GenParams, GenResponse, Prompt, ProviderId};
use reqwest::header::HeaderMap;

/// App attribution flags, sent as headers.
const HEADER_FLAGS: &[&str] = &["http_referer", "x_title"];

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRouterAdapter;

impl ProviderAdapter for OpenRouterAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenRouter
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
                max: 2.0,
            },
        )?;

        let mut headers = chat_completions::bearer_headers(ctx)?;
        if let Some(referer) = ctx.extra_str("http_referer") {
            insert_header(self.id(), &mut headers, "http-referer", referer)?;
        }
        if let Some(title) = ctx.extra_str("x_title") {
            insert_header(self.id(), &mut headers, "x-title", title)?;
        }

        Ok(ProviderRequest {
            url: join_url(&ctx.base_url, PATH),
            headers,
            body: chat_completions::build_body(ctx, prompt, params, "max_tokens", HEADER_FLAGS),
        })
    }

    fn parse_response(&self, ctx: &ProviderContext, body: &serde_json::Value) -> Result<GenResponse> {
        chat_completions::parse_body(ctx, body)
    }

    fn embedded_error(&self, body: &serde_json::Value) -> Option<LlmError> {
        chat_completions::embedded_error(self.id(), body)
    }

    /// Numeric `error.code` values and 402 (credits exhausted) are handled by
    /// the shared envelope classifier.
    fn parse_error(&self, status: u16, headers: &HeaderMap, body: &str) -> LlmError {
        chat_completions::classify_error(self.id(), status, headers, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_context;
    use crate::error::ErrorKind;

    #[test]
    fn base_url_override_and_attribution_headers() {
        let mut ctx = test_context(ProviderId::OpenRouter, "anthropic/claude-sonnet-4");
        ctx.base_url = "https://proxy.internal/api/v1/".into();
        ctx.extra.insert("http_referer".into(), "https://app.example".into());
        ctx.extra.insert("x_title".into(), "Example".into());
        let request = OpenRouterAdapter
            .build_request(&ctx, &Prompt::input("hi"), &GenParams::new())
            .unwrap();
        assert_eq!(request.url, "https://proxy.internal/api/v1/chat/completions");
        assert_eq!(request.headers["http-referer"], "https://app.example");
        assert_eq!(request.headers["x-title"], "Example");
        assert!(request.body.get("x_title").is_none());
    }

    #[test]
    fn payload_is_not_rewritten_for_reasoning_models() {
        let ctx = test_context(ProviderId::OpenRouter, "openai/o3-mini");
        let body = OpenRouterAdapter
            .build_request(&ctx, &Prompt::input("hi"), &GenParams::new().with_max_tokens(50))
            .unwrap()
            .body;
        assert_eq!(body["max_tokens"], 50);
        assert!(body.get("max_completion_tokens").is_none());
    }

    #[test]
    fn routing_extras_pass_through() {
        let ctx = test_context(ProviderId::OpenRouter, "openrouter/auto");
        let params = GenParams::new().with_extra("models", serde_json::json!(["a/b", "c/d"]));
        let body = OpenRouterAdapter
            .build_request(&ctx, &Prompt::input("hi"), &params)
            .unwrap()
            .body;
        assert_eq!(body["models"][1], "c/d");
    }

    #[test]
    fn insufficient_credits_is_provider_error() {
        let body = r#"{"error":{"code":402,"message":"Insufficient credits"}}"#;
        let err = OpenRouterAdapter.parse_error(402, &HeaderMap::new(), body);
        assert_eq!(err.kind(), ErrorKind::Provider);
        assert_eq!(err.status_code(), Some(402));
        assert!(!err.is_retryable());
    }

    #[test]
    fn numeric_code_auth_failure() {
        let body = r#"{"error":{"code":401,"message":"No auth credentials found"}}"#;
        let err = OpenRouterAdapter.parse_error(401, &HeaderMap::new(), body);
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn error_object_in_success_body_is_detected() {
        let throttled = serde_json::json!({"error": {"code": 429, "message": "Upstream rate limited"}});
        let err = OpenRouterAdapter.embedded_error(&throttled).unwrap();
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert!(err.is_retryable());

        let answered = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "hi"}}]
        });
        assert!(OpenRouterAdapter.embedded_error(&answered).is_none());
    }
}
