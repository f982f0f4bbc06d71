//! OpenAI Chat Completions adapter.

use super::chat_completions::{self, PATH};
use super::{
    ProviderAdapter, ProviderContext, ProviderRequest, Range, insert_header, join_url,
    validate_params,
};
use crate::error::{LlmError, Result};
use crate::types::{GenParams, GenResponse, Prompt, ProviderId};
use reqwest::header::HeaderMap;

/// `extra` keys sent as headers instead of body fields.
const HEADER_FLAGS: &[&str] = &["organization", "project"];

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiAdapter;

/// Reasoning families reject `max_tokens` and expect `max_completion_tokens`.
fn uses_completion_token_budget(model: &str) -> bool {
    ["o1", "o3", "o4", "gpt-5"]
        .iter()
        .any(|prefix| model.starts_with(prefix))
}

impl ProviderAdapter for OpenAiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
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
        if let Some(org) = ctx.extra_str("organization") {
            insert_header(self.id(), &mut headers, "openai-organization", org)?;
        }
        if let Some(project) = ctx.extra_str("project") {
            insert_header(self.id(), &mut headers, "openai-project", project)?;
        }

        let max_tokens_key = if uses_completion_token_budget(&ctx.model) {
            "max_completion_tokens"
        } else {
            "max_tokens"
        };

        Ok(ProviderRequest {
            url: join_url(&ctx.base_url, PATH),
            headers,
            body: chat_completions::build_body(ctx, prompt, params, max_tokens_key, HEADER_FLAGS),
        })
    }

    fn parse_response(&self, ctx: &ProviderContext, body: &serde_json::Value) -> Result<GenResponse> {
        chat_completions::parse_body(ctx, body)
    }

    fn embedded_error(&self, body: &serde_json::Value) -> Option<LlmError> {
        chat_completions::embedded_error(self.id(), body)
    }

    fn parse_error(&self, status: u16, headers: &HeaderMap, body: &str) -> LlmError {
        chat_completions::classify_error(self.id(), status, headers, body)
    }
}
