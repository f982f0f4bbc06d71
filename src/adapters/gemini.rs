//! Google Gemini `generateContent` adapter.

use super::{
    ProviderAdapter, ProviderContext, ProviderRequest, Range, f32_value, join_url, merge_extras,
    secret_header, u32_field, validate_params,
};
use crate::error::{LlmError, Result, classify_http_status, error_details, retry_after};
use crate::types::{FinishReason, GenParams, GenResponse, Prompt, ProviderId, Usage, Warning};
use reqwest::header::HeaderMap;
use secrecy::ExposeSecret;
use serde_json::{Map, Value, json};

const RESERVED_KEYS: &[&str] = &[
    "model",
    "contents",
    "systemInstruction",
    "generationConfig",
    "stream",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiAdapter;

/// `models/gemini-2.5-flash` and `gemini-2.5-flash` address the same endpoint;
/// `tunedModels/<id>` keeps its own collection. Segments are encoded one by one.
fn model_path(model: &str) -> String {
    let resource = if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{model}")
    };
    let segments: Vec<_> = resource.split('/').map(urlencoding::encode).collect();
    format!("{}:generateContent", segments.join("/"))
}

fn finish_reason(raw: &str) -> FinishReason {
    match raw {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            FinishReason::ContentFilter
        }
        other => FinishReason::Other(other.to_string()),
    }
}

/// `generationConfig` from typed params, then any `generationConfig` objects
/// found in the extras layers.
fn generation_config(params: &GenParams, layers: &[&std::collections::HashMap<String, Value>]) -> Map<String, Value> {
    let mut config = Map::new();
    if let Some(n) = params.max_tokens {
        config.insert("maxOutputTokens".into(), json!(n));
    }
    if let Some(t) = params.temperature {
        config.insert("temperature".into(), f32_value(t));
    }
    if let Some(p) = params.top_p {
        config.insert("topP".into(), f32_value(p));
    }
    if let Some(stop) = params.stop_sequences.as_ref().filter(|s| !s.is_empty()) {
        config.insert("stopSequences".into(), json!(stop));
    }
    for layer in layers {
        if let Some(Value::Object(overrides)) = layer.get("generationConfig") {
            for (k, v) in overrides {
                config.insert(k.clone(), v.clone());
            }
        }
    }
    config
}

/// Error `details[].reason`, e.g. `API_KEY_INVALID`.
fn detail_reasons(error: &Value) -> Vec<&str> {
    error
        .get("details")
        .and_then(|d| d.as_array())
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d.get("reason").and_then(|r| r.as_str()))
                .collect()
        })
        .unwrap_or_default()
}

impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
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

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            secret_header(self.id(), ctx.api_key.expose_secret())?,
        );

        let layers = [&ctx.extra, &params.extra];
        let mut body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt.input}]}],
        });
        if prompt.has_instructions() {
            body["systemInstruction"] = json!({"parts": [{"text": prompt.instructions}]});
        }
        let config = generation_config(params, &layers);
        if !config.is_empty() {
            body["generationConfig"] = Value::Object(config);
        }
        merge_extras(&mut body, &layers, RESERVED_KEYS, &[]);

        Ok(ProviderRequest {
            url: join_url(&ctx.base_url, &model_path(&ctx.model)),
            headers,
            body,
        })
    }

    fn parse_response(&self, ctx: &ProviderContext, body: &Value) -> Result<GenResponse> {
        let candidate = body
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first());

        let text: String = candidate
            .and_then(|c| c.pointer("/content/parts"))
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter(|p| !p.get("thought").and_then(|t| t.as_bool()).unwrap_or(false))
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        let mut response = GenResponse::new(self.id(), ctx.model.clone(), text);
        response.finish_reason = candidate
            .and_then(|c| c.get("finishReason"))
            .and_then(|r| r.as_str())
            .map(finish_reason);
        response.usage = body.get("usageMetadata").and_then(|u| {
            Usage::from_counts(
                u32_field(u, "promptTokenCount"),
                u32_field(u, "candidatesTokenCount"),
                u32_field(u, "totalTokenCount"),
            )
        });
        response.served_model = body
            .get("modelVersion")
            .and_then(|m| m.as_str())
            .map(str::to_string);

        if candidate.is_none()
            && let Some(reason) = body
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str())
        {
            response.finish_reason = Some(FinishReason::ContentFilter);
            response
                .warnings
                .push(Warning::other(format!("prompt blocked: {reason}")));
        }
        Ok(response)
    }

    fn parse_error(&self, status: u16, headers: &HeaderMap, body: &str) -> LlmError {
        let id = self.id().as_str();
        let parsed = serde_json::from_str::<Value>(body).ok();
        let Some(error) = parsed.as_ref().and_then(|v| v.get("error")).filter(|e| e.is_object())
        else {
            return classify_http_status(id, status, body, headers);
        };

        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        let grpc_status = error.get("status").and_then(|s| s.as_str()).unwrap_or("");
        let reasons = detail_reasons(error);

        let err = if matches!(grpc_status, "UNAUTHENTICATED" | "PERMISSION_DENIED")
            || reasons.contains(&"API_KEY_INVALID")
        {
            LlmError::authentication(id, message)
        } else if grpc_status == "RESOURCE_EXHAUSTED" || status == 429 {
            LlmError::rate_limit(id, message).with_retry_after(retry_after(headers))
        } else if matches!(
            grpc_status,
            "INVALID_ARGUMENT" | "NOT_FOUND" | "FAILED_PRECONDITION"
        ) {
            LlmError::invalid_request(id, message)
        } else {
            match status {
                401 | 403 => LlmError::authentication(id, message),
                400 | 404 | 413 | 415 | 422 => LlmError::invalid_request(id, message),
                _ => LlmError::provider(id, message),
            }
        };
        err.with_status(status)
            .with_details(error_details(status, body, headers))
    }
}
