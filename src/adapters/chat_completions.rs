//! Chat Completions wire format.
//!
//! OpenAI, xAI and OpenRouter all speak this shape; the per-provider adapters
//! only differ in headers, parameter naming and error quirks.

use super::{ProviderContext, f32_value, merge_extras, secret_header, u32_field};
use crate::error::{LlmError, Result, classify_http_status, error_details, retry_after};
use crate::types::{FinishReason, GenParams, GenResponse, Prompt, ProviderId, Usage, Warning};
use reqwest::header::{AUTHORIZATION, HeaderMap};
use serde_json::{Value, json};

/// Body keys the adapter owns; extras never overwrite them.
pub(crate) const RESERVED_KEYS: &[&str] = &["model", "messages", "stream"];

/// Path appended to the base URL.
pub(crate) const PATH: &str = "chat/completions";

/// `Authorization: Bearer <key>` header map.
pub(crate) fn bearer_headers(ctx: &ProviderContext) -> Result<HeaderMap> {
    use secrecy::ExposeSecret;
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        secret_header(ctx.provider, &format!("Bearer {}", ctx.api_key.expose_secret()))?,
    );
    Ok(headers)
}

fn messages(prompt: &Prompt) -> Vec<Value> {
    let mut messages = Vec::with_capacity(2);
    if prompt.has_instructions() {
        messages.push(json!({"role": "system", "content": prompt.instructions}));
    }
    messages.push(json!({"role": "user", "content": prompt.input}));
    messages
}

/// Build the request body.
///
/// `max_tokens_key` is the field name the target model accepts for the output
/// budget; `consumed` lists `extra` keys the adapter already sent as headers.
pub(crate) fn build_body(
    ctx: &ProviderContext,
    prompt: &Prompt,
    params: &GenParams,
    max_tokens_key: &str,
    consumed: &[&str],
) -> Value {
    let mut body = json!({
        "model": ctx.model,
        "messages": messages(prompt),
    });
    if let Some(max_tokens) = params.max_tokens {
        body[max_tokens_key] = json!(max_tokens);
    }
    if let Some(t) = params.temperature {
        body["temperature"] = f32_value(t);
    }
    if let Some(p) = params.top_p {
        body["top_p"] = f32_value(p);
    }
    if let Some(stop) = params.stop_sequences.as_ref().filter(|s| !s.is_empty()) {
        body["stop"] = json!(stop);
    }
    merge_extras(&mut body, &[&ctx.extra, &params.extra], RESERVED_KEYS, consumed);
    body
}

/// `content` is usually a string; some compatible backends return typed parts.
fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter(|p| p.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect(),
        _ => String::new(),
    }
}

pub(crate) fn finish_reason(raw: &str) -> FinishReason {
    match raw {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        other => FinishReason::Other(other.to_string()),
    }
}

/// Extract text, usage and finish reason from a success body.
///
/// Zero choices, or a choice whose content is null, yields empty text.
pub(crate) fn parse_body(ctx: &ProviderContext, body: &Value) -> Result<GenResponse> {
    if let Some(err) = embedded_error(ctx.provider, body) {
        return Err(err);
    }

    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first());
    let message = choice.and_then(|c| c.get("message"));

    let text = message
        .and_then(|m| m.get("content"))
        .map(content_text)
        .unwrap_or_default();

    let mut response = GenResponse::new(ctx.provider, ctx.model.clone(), text);
    response.finish_reason = choice
        .and_then(|c| c.get("finish_reason"))
        .and_then(|v| v.as_str())
        .map(finish_reason);
    response.usage = body.get("usage").and_then(|u| {
        Usage::from_counts(
            u32_field(u, "prompt_tokens"),
            u32_field(u, "completion_tokens"),
            u32_field(u, "total_tokens"),
        )
    });
    response.served_model = body
        .get("model")
        .and_then(|m| m.as_str())
        .map(str::to_string);
    if let Some(refusal) = message
        .and_then(|m| m.get("refusal"))
        .and_then(|r| r.as_str())
    {
        response.warnings.push(Warning::other(format!("model refused: {refusal}")));
    }
    Ok(response)
}

/// A `200` body carrying an `error` object instead of choices (OpenRouter
/// reports mid-route upstream failures this way).
pub(crate) fn embedded_error(provider: ProviderId, body: &Value) -> Option<LlmError> {
    let has_choices = body
        .get("choices")
        .and_then(|c| c.as_array())
        .is_some_and(|c| !c.is_empty());
    if has_choices || !body.get("error").is_some_and(Value::is_object) {
        return None;
    }
    let envelope = Envelope::from_value(body)?;
    let status = envelope
        .numeric_code
        .filter(|c| (400..=599).contains(c))
        .unwrap_or(200);
    Some(classify_envelope(
        provider,
        status,
        &HeaderMap::new(),
        &body.to_string(),
        envelope,
    ))
}

/// Parsed `{ "error": ... }` envelope.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub message: String,
    pub error_type: Option<String>,
    pub code: Option<String>,
    pub numeric_code: Option<u16>,
}

impl Envelope {
    pub(crate) fn parse(body_text: &str) -> Option<Self> {
        let json: Value = serde_json::from_str(body_text).ok()?;
        Self::from_value(&json)
    }

    /// Accepts the nested `{error:{message,type,code}}` shape and the flat
    /// `{error:"...", code:"..."}` shape xAI uses.
    fn from_value(json: &Value) -> Option<Self> {
        match json.get("error")? {
            Value::Object(obj) => {
                let code = obj.get("code");
                Some(Self {
                    message: obj
                        .get("message")
                        .and_then(|v| v.as_str())
                        .unwrap_or("Unknown error")
                        .to_string(),
                    error_type: obj
                        .get("type")
                        .and_then(|v| v.as_str())
                        .filter(|t| !t.is_empty())
                        .map(str::to_string),
                    code: code.and_then(|v| match v {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    }),
                    numeric_code: code
                        .and_then(|v| v.as_u64())
                        .and_then(|n| u16::try_from(n).ok()),
                })
            }
            Value::String(message) => Some(Self {
                message: message.clone(),
                error_type: None,
                code: json.get("code").and_then(|v| v.as_str()).map(str::to_string),
                numeric_code: None,
            }),
            _ => None,
        }
    }
}

/// Classify an error response, preferring the structured envelope and falling
/// back to the status code.
pub(crate) fn classify_error(
    provider: ProviderId,
    status: u16,
    headers: &HeaderMap,
    body_text: &str,
) -> LlmError {
    match Envelope::parse(body_text) {
        Some(envelope) => classify_envelope(provider, status, headers, body_text, envelope),
        None => classify_http_status(provider.as_str(), status, body_text, headers),
    }
}

fn classify_envelope(
    provider: ProviderId,
    status: u16,
    headers: &HeaderMap,
    body_text: &str,
    envelope: Envelope,
) -> LlmError {
    let id = provider.as_str();
    let error_type = envelope.error_type.as_deref().unwrap_or("");
    let code = envelope.code.as_deref().unwrap_or("");
    let lower = envelope.message.to_lowercase();
    let message = envelope.message;

    // Quota exhaustion is a billing state, not throttling; retrying cannot help.
    let err = if error_type == "insufficient_quota" || code == "insufficient_quota" {
        LlmError::provider(id, message)
    } else if matches!(status, 401 | 403)
        || matches!(error_type, "authentication_error" | "permission_error")
        || code == "invalid_api_key"
    {
        LlmError::authentication(id, message)
    } else if status == 429
        || error_type == "rate_limit_error"
        || code == "rate_limit_exceeded"
        || (error_type.is_empty() && lower.contains("rate limit"))
    {
        LlmError::rate_limit(id, message).with_retry_after(retry_after(headers))
    } else if matches!(error_type, "invalid_request_error" | "not_found_error")
        || code == "model_not_found"
        || matches!(status, 400 | 404 | 413 | 415 | 422)
    {
        LlmError::invalid_request(id, message)
    } else {
        LlmError::provider(id, message)
    };

    err.with_status(status)
        .with_details(error_details(status, body_text, headers))
}
