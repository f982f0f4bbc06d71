//! Provider Adapters
//!
//! An adapter translates the unified model to and from one provider's wire
//! format. The dispatch pipeline only ever talks to [`ProviderAdapter`]; every
//! provider-specific decision (auth placement, body layout, parameter names and
//! ranges, error vocabulary) lives behind it.
//!
//! Adding a provider means adding a `ProviderId` variant, an adapter here and a
//! registry descriptor. The dispatch core does not change.

pub mod anthropic;
pub mod chat_completions;
pub mod gemini;
pub mod openai;
pub mod openrouter;
pub mod xai;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;
pub use openrouter::OpenRouterAdapter;
pub use xai::XaiAdapter;

use crate::error::{LlmError, Result};
use crate::types::{GenParams, GenResponse, Prompt, ProviderId, Warning};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use secrecy::SecretString;
use std::collections::HashMap;

/// Resolved per-client state an adapter reads while building requests.
#[derive(Clone)]
pub struct ProviderContext {
    pub provider: ProviderId,
    pub model: String,
    pub base_url: String,
    pub api_key: SecretString,
    /// `ProviderConfig.extra`, interpreted only by the matching adapter
    pub extra: HashMap<String, serde_json::Value>,
}

impl ProviderContext {
    /// String flag from `extra`, if present.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }
}

impl std::fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderContext")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("extra", &self.extra)
            .finish()
    }
}

/// Native request produced by an adapter.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

/// Translation between the unified model and one provider's wire format.
pub trait ProviderAdapter: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Map prompt and parameters onto the provider's URL, headers and JSON body,
    /// applying provider defaults for anything the caller left unset.
    fn build_request(
        &self,
        ctx: &ProviderContext,
        prompt: &Prompt,
        params: &GenParams,
    ) -> Result<ProviderRequest>;

    /// Extract generated text, usage and finish reason from a success body.
    fn parse_response(&self, ctx: &ProviderContext, body: &serde_json::Value) -> Result<GenResponse>;

    /// Classify a non-success status and body into the unified taxonomy.
    fn parse_error(&self, status: u16, headers: &HeaderMap, body: &str) -> LlmError;

    /// Error object carried by a 2xx body, for providers that report some
    /// failures that way. Checked before `parse_response` so the failure is
    /// classified, and retried, like a status error.
    fn embedded_error(&self, _body: &serde_json::Value) -> Option<LlmError> {
        None
    }

    /// Advisory model-name check. Never blocks a call.
    fn check_model(&self, model: &str) -> Option<Warning> {
        crate::registry::models::check_model(self.id(), model)
    }
}

/// Range rule applied to a numeric parameter before the request leaves the process.
pub(crate) struct Range {
    pub field: &'static str,
    pub min: f32,
    pub max: f32,
}

/// Checks shared by every provider: non-empty model, positive `max_tokens`,
/// and in-range sampling parameters.
pub(crate) fn validate_params(
    provider: ProviderId,
    ctx: &ProviderContext,
    params: &GenParams,
    temperature: Range,
) -> Result<()> {
    if ctx.model.trim().is_empty() {
        return Err(LlmError::invalid_request(
            provider.as_str(),
            "Model must be specified",
        ));
    }
    if params.max_tokens == Some(0) {
        return Err(LlmError::invalid_request(
            provider.as_str(),
            "max_tokens must be greater than 0",
        ));
    }
    check_range(provider, &temperature, params.temperature)?;
    check_range(
        provider,
        &Range {
            field: "top_p",
            min: 0.0,
            max: 1.0,
        },
        params.top_p,
    )
}

fn check_range(provider: ProviderId, rule: &Range, value: Option<f32>) -> Result<()> {
    match value {
        Some(v) if !(rule.min..=rule.max).contains(&v) => Err(LlmError::invalid_request(
            provider.as_str(),
            format!(
                "{} must be between {} and {} for {provider} (got {v})",
                rule.field, rule.min, rule.max
            ),
        )),
        _ => Ok(()),
    }
}

/// Merge passthrough maps into a JSON object body.
///
/// Layers apply in order, so later layers win. Keys in `reserved` (structural
/// fields the adapter owns) and keys in `consumed` (flags the adapter already
/// turned into headers) are skipped, as are `null` values.
pub(crate) fn merge_extras(
    body: &mut serde_json::Value,
    layers: &[&HashMap<String, serde_json::Value>],
    reserved: &[&str],
    consumed: &[&str],
) {
    let Some(obj) = body.as_object_mut() else {
        return;
    };
    for layer in layers {
        for (k, v) in layer.iter() {
            if v.is_null() || reserved.contains(&k.as_str()) || consumed.contains(&k.as_str()) {
                continue;
            }
            obj.insert(k.clone(), v.clone());
        }
    }
}

/// Insert a header, rejecting values that cannot be sent.
pub(crate) fn insert_header(
    provider: ProviderId,
    headers: &mut HeaderMap,
    name: &'static str,
    value: &str,
) -> Result<()> {
    let value = HeaderValue::from_str(value).map_err(|_| {
        LlmError::invalid_request(
            provider.as_str(),
            format!("value for header '{name}' contains characters that cannot be sent"),
        )
    })?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

/// Header value for a secret, marked sensitive so it is masked in debug output.
pub(crate) fn secret_header(provider: ProviderId, value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value).map_err(|_| {
        LlmError::authentication(
            provider.as_str(),
            "API key contains characters that cannot be sent in a header",
        )
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// JSON number for a sampling parameter, keeping the caller's decimal form
/// (`0.7`, not the widened `0.699999988079071`).
pub(crate) fn f32_value(v: f32) -> serde_json::Value {
    let widened = v.to_string().parse::<f64>().unwrap_or(f64::from(v));
    serde_json::Number::from_f64(widened)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Read a non-negative integer counter, tolerating absent or non-numeric fields.
pub(crate) fn u32_field(value: &serde_json::Value, key: &str) -> Option<u32> {
    value
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
pub(crate) fn test_context(provider: ProviderId, model: &str) -> ProviderContext {
    let descriptor = crate::registry::descriptor(provider);
    ProviderContext {
        provider,
        model: model.to_string(),
        base_url: descriptor.default_base_url.to_string(),
        api_key: SecretString::from("test-key".to_string()),
        extra: HashMap::new(),
    }
}
