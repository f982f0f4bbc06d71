//! Credential resolution.
//!
//! Precedence: explicit `ProviderConfig` key, then the provider's designated
//! environment variable. This module is the only place that reads the
//! environment, and it does so through [`EnvSource`] so callers and tests can
//! inject their own.

use crate::error::{LlmError, Result};
use crate::types::{ProviderConfig, ProviderId};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

/// Source of environment variables.
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed set of variables, for tests and embedded configuration.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Resolve the credential for `provider`.
///
/// Blank values (explicit or from the environment) count as absent. Failing
/// here is an `AuthenticationError`, raised before any request is built.
pub fn resolve_api_key(
    config: &ProviderConfig,
    provider: ProviderId,
    env_var: &str,
    env: &dyn EnvSource,
) -> Result<SecretString> {
    if let Some(key) = config.api_key().map(|k| k.expose_secret().trim())
        && !key.is_empty()
    {
        return Ok(SecretString::from(key.to_string()));
    }

    match env.var(env_var) {
        Some(value) if !value.trim().is_empty() => {
            tracing::debug!(provider = %provider, env_var, "api key resolved from environment");
            Ok(SecretString::from(value.trim().to_string()))
        }
        _ => Err(LlmError::authentication(
            provider.as_str(),
            format!("API key not specified (missing {env_var} or explicit api_key)"),
        )),
    }
}
