//! Unified response types.

use super::ProviderId;
use serde::{Deserialize, Serialize};

/// Token counts reported by the provider.
///
/// Each counter is optional: providers that omit a counter leave it `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32, total_tokens: u32) -> Self {
        Self {
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
            total_tokens: Some(total_tokens),
        }
    }

    /// Build from raw counters; `None` when the provider reported none of them.
    pub fn from_counts(
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
        total_tokens: Option<u32>,
    ) -> Option<Self> {
        if prompt_tokens.is_none() && completion_tokens.is_none() && total_tokens.is_none() {
            return None;
        }
        Some(Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        })
    }
}

/// Why the provider stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Other(String),
}

/// Non-fatal notice attached to a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Warning {
    /// The model name does not match the provider's usual naming pattern
    UnrecognizedModel { provider: ProviderId, model: String },
    /// Provider-reported notice (e.g. a blocked prompt)
    Other { message: String },
}

impl Warning {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnrecognizedModel { provider, model } => write!(
                f,
                "model '{model}' does not look like a {provider} model; sending it anyway"
            ),
            Self::Other { message } => f.write_str(message),
        }
    }
}

/// Generated text plus the provider/model that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenResponse {
    pub text: String,
    pub provider: ProviderId,
    /// Model from the configuration used for the call
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Model id reported in the provider payload, if any. May name a dated
    /// snapshot behind the configured alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub served_model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    /// Provider payload, kept for diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl GenResponse {
    pub fn new(provider: ProviderId, model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider,
            model: model.into(),
            usage: None,
            finish_reason: None,
            served_model: None,
            warnings: Vec::new(),
            raw: None,
        }
    }
}
