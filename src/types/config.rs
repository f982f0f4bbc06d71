//! Provider configuration.

use secrecy::SecretString;
use std::collections::HashMap;

/// Provider-agnostic configuration for one provider/model pair.
///
/// Immutable once constructed: the `with_*` methods consume and return the
/// value, and there are no setters. The provider is kept as the caller's
/// identifier string; it is resolved (and rejected when unknown) by the
/// dispatch pipeline.
///
/// ```rust
/// use llm_dispatch::{ProviderConfig, ProviderId};
///
/// let config = ProviderConfig::new(ProviderId::OpenAi, "gpt-4o")
///     .with_api_key("sk-test")
///     .with_extra("organization", "org_123");
/// assert_eq!(config.provider(), "openai");
/// assert_eq!(config.model(), "gpt-4o");
/// ```
#[derive(Clone)]
pub struct ProviderConfig {
    provider: String,
    model: String,
    api_key: Option<SecretString>,
    base_url: Option<String>,
    extra: HashMap<String, serde_json::Value>,
}

impl ProviderConfig {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            api_key: None,
            base_url: None,
            extra: HashMap::new(),
        }
    }

    /// Explicit credential; takes precedence over the provider's environment variable.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    /// Override the registry's default base URL (e.g. a compatible proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Provider-specific flag. Only the matching adapter interprets it.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_extras(mut self, extras: HashMap<String, serde_json::Value>) -> Self {
        self.extra.extend(extras);
        self
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn extra(&self) -> &HashMap<String, serde_json::Value> {
        &self.extra
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("extra", &self.extra)
            .finish()
    }
}
