//! xAI (Grok) adapter. Chat Completions shape with xAI's own error body.

use super::chat_completions::{self, PATH};
use super::{ProviderAdapter, ProviderContext, ProviderRequest, Range, join_url, validate_params};
use crate::error::{ErrorKind, LlmError, Result};
use crate::types::{GenParams, GenResponse, Prompt, ProviderId};
use reqwest::header::HeaderMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct XaiAdapter;

impl ProviderAdapter for XaiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Xai
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
        Ok(ProviderRequest {
            url: join_url(&ctx.base_url, PATH),
            headers: chat_completions::bearer_headers(ctx)?,
            body: chat_completions::build_body(ctx, prompt, params, "max_tokens", &[]),
        })
    }

    fn parse_response(&self, ctx: &ProviderContext, body: &serde_json::Value) -> Result<GenResponse> {
        chat_completions::parse_body(ctx, body)
    }

    fn embedded_error(&self, body: &serde_json::Value) -> Option<LlmError> {
        chat_completions::embedded_error(self.id(), body)
    }

    /// xAI rejects a bad key with `400` and a flat `{code, error}` body, so
    /// the message decides between authentication and a malformed request.
    fn parse_error(&self, status: u16, headers: &HeaderMap, body: &str) -> LlmError {
        let err = chat_completions::classify_error(self.id(), status, headers, body);
        if err.kind() != ErrorKind::InvalidRequest {
            return err;
        }
        let lower = err.message().to_lowercase();
        let bad_key = lower.contains("api key")
            && (lower.contains("incorrect") || lower.contains("invalid"));
        if !bad_key {
            return err;
        }
        let auth = LlmError::authentication(self.id().as_str(), err.message()).with_status(status);
        match err.details() {
            Some(details) => auth.with_details(details.clone()),
            None => auth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_xai_base_url() {
        let ctx = test_context();
        let request = XaiAdapter
            .build_request(&ctx, &Prompt::input("hi"), &GenParams::new().with_max_tokens(5))
            .unwrap();
        assert_eq!(request.url, "https://api.x.ai/v1/chat/completions");
        assert_eq!(request.body["max_tokens"], 5);
    }

    #[test]
    fn flat_invalid_key_body_is_authentication() {
        let body = r#"{"code":"Client specified an invalid argument","error":"Incorrect API key provided: xa***. You can obtain an API key from https://console.x.ai."}"#;
        let err = XaiAdapter.parse_error(400, &HeaderMap::new(), body);
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(err.status_code(), Some(400));
        assert!(err.message().starts_with("Incorrect API key"));
    }

    #[test]
    fn other_400s_stay_invalid_request() {
        let body = r#"{"code":"Client specified an invalid argument","error":"temperature out of range"}"#;
        let err = XaiAdapter.parse_error(400, &HeaderMap::new(), body);
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn parses_grok_payload() {
        let body = json!({
            "model": "grok-3",
            "choices": [{"message": {"content": "hello"}, "finish_reason": "length"}],
        });
        let response = XaiAdapter.parse_response(&test_context(), &body).unwrap();
        assert_eq!(response.text, "hello");
        assert_eq!(response.provider, ProviderId::Xai);
    }

    fn test_context() -> ProviderContext {
        crate::adapters::test_context(ProviderId::Xai, "grok-3")
    }
}
