//! Client facade.
//!
//! `LlmClient` validates its configuration once and reuses the bound adapter
//! for every call. It holds no per-call mutable state, so one instance can be
//! cloned and shared across tasks and threads freely.

use crate::auth::{EnvSource, ProcessEnv};
use crate::error::{LlmError, Result};
use crate::execution::{
    BlockingHttpTransport, Dispatcher, HttpTransport, ReqwestBlockingTransport, ReqwestTransport,
    ResolvedProvider,
};
use crate::retry::RetryPolicy;
use crate::types::{GenParams, GenResponse, HttpConfig, Prompt, ProviderConfig, ProviderId, Warning};
use std::sync::Arc;
use std::time::Duration;

/// Validated, reusable handle for one provider/model pair.
///
/// ```rust,no_run
/// use llm_dispatch::prelude::*;
///
/// # async fn run() -> Result<(), LlmError> {
/// let client = LlmClient::new(ProviderConfig::new("anthropic", "claude-sonnet-4-5"))?;
/// let response = client
///     .generate(&Prompt::new("You are terse.", "Name a prime."), &GenParams::new())
///     .await?;
/// println!("{}", response.text);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LlmClient {
    dispatcher: Dispatcher,
}

static_assertions::assert_impl_all!(LlmClient: Send, Sync, Clone);

impl LlmClient {
    /// Client with default transports, retry policy and the process environment.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: ProviderConfig) -> LlmClientBuilder {
        LlmClientBuilder::new(config)
    }

    /// Generate a completion without blocking the calling thread.
    pub async fn generate(&self, prompt: &Prompt, params: &GenParams) -> Result<GenResponse> {
        self.dispatcher.invoke(prompt, params).await
    }

    /// Generate a completion on the calling thread.
    ///
    /// With the default transport this must not be called from within an
    /// async runtime; use [`LlmClient::generate`] there.
    pub fn generate_blocking(&self, prompt: &Prompt, params: &GenParams) -> Result<GenResponse> {
        self.dispatcher.invoke_blocking(prompt, params)
    }

    pub fn provider(&self) -> ProviderId {
        self.dispatcher.resolved().provider()
    }

    pub fn model(&self) -> &str {
        self.dispatcher.resolved().model()
    }

    pub fn base_url(&self) -> &str {
        self.dispatcher.resolved().base_url()
    }

    /// Advisory notices found at construction; also attached to every response.
    pub fn warnings(&self) -> &[Warning] {
        self.dispatcher.resolved().warnings()
    }

    pub fn config(&self) -> &ProviderConfig {
        self.dispatcher.resolved().config()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.dispatcher.retry_policy()
    }

    pub fn http_config(&self) -> &HttpConfig {
        self.dispatcher.http_config()
    }
}

/// Builder for [`LlmClient`].
pub struct LlmClientBuilder {
    config: ProviderConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    blocking_transport: Option<Arc<dyn BlockingHttpTransport>>,
    retry_policy: RetryPolicy,
    http_config: HttpConfig,
    env: Arc<dyn EnvSource>,
    include_raw: bool,
}

impl LlmClientBuilder {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            transport: None,
            blocking_transport: None,
            retry_policy: RetryPolicy::default(),
            http_config: HttpConfig::default(),
            env: Arc::new(ProcessEnv),
            include_raw: true,
        }
    }

    /// Transport for [`LlmClient::generate`]. Defaults to [`ReqwestTransport`].
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Transport for [`LlmClient::generate_blocking`]. Defaults to
    /// [`ReqwestBlockingTransport`].
    pub fn blocking_transport(mut self, transport: Arc<dyn BlockingHttpTransport>) -> Self {
        self.blocking_transport = Some(transport);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Replaces the whole HTTP configuration, including any earlier `timeout`.
    pub fn http_config(mut self, config: HttpConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http_config.timeout = timeout;
        self
    }

    /// Where to look up credentials that are not set explicitly.
    pub fn env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Keep the provider payload in `GenResponse::raw` (on by default).
    pub fn include_raw(mut self, include_raw: bool) -> Self {
        self.include_raw = include_raw;
        self
    }

    /// Validate and resolve the configuration.
    ///
    /// Fails exactly as a call would: unknown provider, then missing
    /// credential. No network access happens here.
    pub fn build(self) -> Result<LlmClient> {
        let resolved = ResolvedProvider::resolve(&self.config, self.env.as_ref())?;
        let provider = resolved.provider();

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&self.http_config).map_err(|e| {
                LlmError::invalid_request(
                    provider.as_str(),
                    format!("invalid HTTP configuration: {}", e.message),
                )
            })?),
        };
        let blocking_transport: Arc<dyn BlockingHttpTransport> = match self.blocking_transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestBlockingTransport::new(self.http_config.clone())),
        };

        Ok(LlmClient {
            dispatcher: Dispatcher::new(
                Arc::new(resolved),
                transport,
                blocking_transport,
                self.retry_policy,
                self.http_config,
                self.include_raw,
            ),
        })
    }
}

impl std::fmt::Debug for LlmClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClientBuilder")
            .field("config", &self.config)
            .field("retry_policy", &self.retry_policy)
            .field("http_config", &self.http_config)
            .field("include_raw", &self.include_raw)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MapEnv;
    use crate::error::ErrorKind;

    #[test]
    fn build_resolves_key_from_injected_env() {
        let client = LlmClient::builder(ProviderConfig::new("gemini", "gemini-2.5-flash"))
            .env(MapEnv::new().with("GEMINI_API_KEY", "g-key"))
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(client.provider(), ProviderId::Gemini);
        assert_eq!(client.model(), "gemini-2.5-flash");
        assert_eq!(client.http_config().timeout, Duration::from_secs(5));
        assert!(client.warnings().is_empty());
    }

    #[test]
    fn build_fails_without_credentials() {
        let err = LlmClient::builder(ProviderConfig::new("openai", "gpt-4o"))
            .env(MapEnv::new())
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn clones_share_configuration() {
        let client = LlmClient::builder(ProviderConfig::new("xai", "grok-3").with_api_key("k"))
            .retry_policy(RetryPolicy::none())
            .build()
            .unwrap();
        let clone = client.clone();
        assert_eq!(clone.model(), client.model());
        assert_eq!(clone.retry_policy().max_attempts, 1);
        assert_eq!(clone.config().provider(), "xai");
    }
}
