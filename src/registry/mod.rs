//! Provider Registry
//!
//! Static table mapping each supported provider to its adapter, default base
//! URL and credential environment variable. The table is built once and never
//! mutated, so lookups are lock-free.

pub mod models;

use crate::adapters::{
    AnthropicAdapter, GeminiAdapter, OpenAiAdapter, OpenRouterAdapter, ProviderAdapter, XaiAdapter,
};
use crate::error::Result;
use crate::types::ProviderId;
use std::sync::Arc;

/// Everything the dispatch core needs to talk to one provider.
#[derive(Clone)]
pub struct AdapterDescriptor {
    pub provider: ProviderId,
    pub default_base_url: &'static str,
    pub api_key_env: &'static str,
    pub adapter: Arc<dyn ProviderAdapter>,
}

impl std::fmt::Debug for AdapterDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterDescriptor")
            .field("provider", &self.provider)
            .field("default_base_url", &self.default_base_url)
            .field("api_key_env", &self.api_key_env)
            .finish_non_exhaustive()
    }
}

impl AdapterDescriptor {
    fn builtin(provider: ProviderId) -> Self {
        let (default_base_url, api_key_env) = match provider {
            ProviderId::OpenAi => ("https://api.openai.com/v1", "OPENAI_API_KEY"),
            ProviderId::Anthropic => ("https://api.anthropic.com/v1", "ANTHROPIC_API_KEY"),
            ProviderId::Gemini => (
                "https://generativelanguage.googleapis.com/v1beta",
                "GEMINI_API_KEY",
            ),
            ProviderId::Xai => ("https://api.x.ai/v1", "XAI_API_KEY"),
            ProviderId::OpenRouter => ("https://openrouter.ai/api/v1", "OPENROUTER_API_KEY"),
        };
        Self {
            provider,
            default_base_url,
            api_key_env,
            adapter: adapter_for(provider),
        }
    }
}

fn adapter_for(provider: ProviderId) -> Arc<dyn ProviderAdapter> {
    match provider {
        ProviderId::OpenAi => Arc::new(OpenAiAdapter),
        ProviderId::Anthropic => Arc::new(AnthropicAdapter),
        ProviderId::Gemini => Arc::new(GeminiAdapter),
        ProviderId::Xai => Arc::new(XaiAdapter),
        ProviderId::OpenRouter => Arc::new(OpenRouterAdapter),
    }
}

lazy_static::lazy_static! {
    /// Indexed by `ProviderId` declaration order.
    static ref DESCRIPTORS: [AdapterDescriptor; 5] = ProviderId::ALL.map(AdapterDescriptor::builtin);
}

/// Descriptor for a known provider.
pub fn descriptor(provider: ProviderId) -> &'static AdapterDescriptor {
    &DESCRIPTORS[provider as usize]
}

/// Resolve a caller-supplied identifier (aliases accepted).
///
/// Fails with `UnknownProviderError` naming the identifier and the valid set.
pub fn resolve(identifier: &str) -> Result<&'static AdapterDescriptor> {
    let provider: ProviderId = identifier.parse()?;
    Ok(descriptor(provider))
}

/// All registered providers.
pub fn providers() -> impl Iterator<Item = &'static AdapterDescriptor> {
    DESCRIPTORS.iter()
}
