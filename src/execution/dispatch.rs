//! Dispatch core.
//!
//! `Validating → Resolving → Building → Invoking → Parsing → {Succeeded, Failed}`.
//!
//! Validation (known provider, usable credential) always completes before a
//! request is built, so a call that can never authenticate never sends the
//! prompt anywhere. The blocking and suspending paths share every phase except
//! how the transport is awaited.

use super::transport::{
    BlockingHttpTransport, HttpTransport, HttpTransportRequest, HttpTransportResponse,
    TransportError, TransportErrorKind,
};
use crate::adapters::{ProviderAdapter, ProviderContext};
use crate::auth::{EnvSource, resolve_api_key};
use crate::error::{LlmError, Result};
use crate::observability::ProviderTracer;
use crate::registry::{self, AdapterDescriptor};
use crate::retry::{RetryExecutor, RetryPolicy, Retryable};
use crate::types::{GenParams, GenResponse, HttpConfig, Prompt, ProviderConfig, ProviderId, Warning};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, warn};

/// Pipeline state, recorded on tracing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Validating,
    Resolving,
    Building,
    Invoking,
    Parsing,
    Succeeded,
    Failed,
}

impl DispatchPhase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Resolving => "resolving",
            Self::Building => "building",
            Self::Invoking => "invoking",
            Self::Parsing => "parsing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated configuration bound to its adapter.
///
/// Read-only after construction; shared across concurrent calls.
#[derive(Debug, Clone)]
pub struct ResolvedProvider {
    descriptor: &'static AdapterDescriptor,
    context: ProviderContext,
    config: ProviderConfig,
    warnings: Vec<Warning>,
}

impl ResolvedProvider {
    /// Phases 1 and 2: identify the provider, resolve the credential, then bind
    /// adapter, base URL and model.
    pub fn resolve(config: &ProviderConfig, env: &dyn EnvSource) -> Result<Self> {
        debug!(phase = %DispatchPhase::Validating, provider = config.provider(), "validating config");
        let descriptor = registry::resolve(config.provider())?;
        let provider = descriptor.provider;
        let api_key = resolve_api_key(config, provider, descriptor.api_key_env, env)?;

        debug!(phase = %DispatchPhase::Resolving, provider = %provider, "resolving adapter");
        let base_url = config
            .base_url()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(descriptor.default_base_url)
            .to_string();

        let warnings: Vec<Warning> = descriptor.adapter.check_model(config.model()).into_iter().collect();
        for warning in &warnings {
            warn!(provider = %provider, model = config.model(), "{warning}");
        }

        Ok(Self {
            descriptor,
            context: ProviderContext {
                provider,
                model: config.model().to_string(),
                base_url,
                api_key,
                extra: config.extra().clone(),
            },
            config: config.clone(),
            warnings,
        })
    }

    pub fn provider(&self) -> ProviderId {
        self.context.provider
    }

    pub fn model(&self) -> &str {
        &self.context.model
    }

    pub fn base_url(&self) -> &str {
        &self.context.base_url
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Advisory notices found while resolving (e.g. unrecognized model name).
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    fn adapter(&self) -> &dyn ProviderAdapter {
        self.descriptor.adapter.as_ref()
    }
}

/// Why one attempt failed.
#[derive(Debug)]
enum AttemptError {
    /// No HTTP response arrived
    Transport { error: TransportError, attempt: u32 },
    /// The provider answered with a failure status
    Provider(LlmError),
}

impl Retryable for AttemptError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { error, .. } => error.is_retryable(),
            Self::Provider(e) => e.is_retryable(),
        }
    }

    fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Self::Transport { .. } => None,
            Self::Provider(e) => e.retry_after(),
        }
    }
}

impl AttemptError {
    fn into_llm_error(self, provider: ProviderId) -> LlmError {
        match self {
            Self::Transport { error, attempt } => match error.kind {
                TransportErrorKind::Timeout => {
                    LlmError::timeout(provider.as_str(), error.message, attempt)
                }
                kind => LlmError::provider(provider.as_str(), format!("transport error: {}", error.message))
                    .with_details(serde_json::json!({
                        "transport": kind,
                        "attempts": attempt,
                    })),
            },
            Self::Provider(e) => e,
        }
    }
}

/// A 2xx response with its body decoded once.
struct Delivered {
    status: u16,
    /// Decoded JSON, or the decode error and the raw text
    body: std::result::Result<serde_json::Value, (serde_json::Error, String)>,
}

impl Delivered {
    fn decode(response: HttpTransportResponse) -> Self {
        let body = serde_json::from_slice(&response.body).map_err(|e| (e, response.body_text().into_owned()));
        Self {
            status: response.status,
            body,
        }
    }
}

/// Phases 3 to 5 for one resolved provider.
#[derive(Clone)]
pub struct Dispatcher {
    resolved: Arc<ResolvedProvider>,
    transport: Arc<dyn HttpTransport>,
    blocking_transport: Arc<dyn BlockingHttpTransport>,
    retry: RetryExecutor,
    http: HttpConfig,
    include_raw: bool,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("resolved", &self.resolved)
            .field("retry", &self.retry)
            .field("http", &self.http)
            .field("include_raw", &self.include_raw)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        resolved: Arc<ResolvedProvider>,
        transport: Arc<dyn HttpTransport>,
        blocking_transport: Arc<dyn BlockingHttpTransport>,
        retry_policy: RetryPolicy,
        http: HttpConfig,
        include_raw: bool,
    ) -> Self {
        Self {
            resolved,
            transport,
            blocking_transport,
            retry: RetryExecutor::new(retry_policy),
            http,
            include_raw,
        }
    }

    pub fn resolved(&self) -> &ResolvedProvider {
        &self.resolved
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.retry.policy()
    }

    pub fn http_config(&self) -> &HttpConfig {
        &self.http
    }

    fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "llm_dispatch.generate",
            provider = %self.resolved.provider(),
            model = %self.resolved.model(),
            call_id = %uuid::Uuid::new_v4(),
        )
    }

    fn tracer(&self) -> ProviderTracer {
        ProviderTracer::new(self.resolved.provider(), self.resolved.model())
    }

    /// Suspending call. The task yields while the transport and backoff run.
    pub async fn invoke(&self, prompt: &Prompt, params: &GenParams) -> Result<GenResponse> {
        let tracer = self.tracer();
        let started = Instant::now();
        async {
            let request = self.build(prompt, params, &tracer)?;
            let request = &request;
            let tracer = &tracer;
            let response = self
                .retry
                .execute(move |attempt| self.attempt(request, attempt, tracer))
                .await
                .map_err(|e| e.into_llm_error(self.resolved.provider()))?;
            self.parse(response)
        }
        .instrument(self.span())
        .await
        .inspect(|r| tracer.trace_request_complete(started, r.usage.as_ref()))
        .inspect_err(|e| self.record_failure(&tracer, e, started))
    }

    /// Blocking call on the caller's thread. Same phases as [`Self::invoke`].
    pub fn invoke_blocking(&self, prompt: &Prompt, params: &GenParams) -> Result<GenResponse> {
        let span = self.span();
        let _entered = span.enter();
        let tracer = self.tracer();
        let started = Instant::now();

        let result = self.build(prompt, params, &tracer).and_then(|request| {
            let response = self
                .retry
                .execute_blocking(|attempt| self.attempt_blocking(&request, attempt, &tracer))
                .map_err(|e| e.into_llm_error(self.resolved.provider()))?;
            self.parse(response)
        });
        result
            .inspect(|r| tracer.trace_request_complete(started, r.usage.as_ref()))
            .inspect_err(|e| self.record_failure(&tracer, e, started))
    }

    fn record_failure(&self, tracer: &ProviderTracer, error: &LlmError, started: Instant) {
        debug!(phase = %DispatchPhase::Failed, kind = ?error.kind());
        tracer.trace_request_error(error, started);
    }

    /// Phase 3: adapter payload plus common headers.
    fn build(
        &self,
        prompt: &Prompt,
        params: &GenParams,
        tracer: &ProviderTracer,
    ) -> Result<HttpTransportRequest> {
        debug!(phase = %DispatchPhase::Building);
        let native = self
            .resolved
            .adapter()
            .build_request(&self.resolved.context, prompt, params)?;
        let headers = self.merge_headers(native.headers)?;
        tracer.trace_request_details(&headers, &native.body);
        Ok(HttpTransportRequest {
            url: native.url,
            headers,
            body: native.body,
            timeout: self.http.timeout,
        })
    }

    /// Common headers first, then `HttpConfig` extras, then adapter headers.
    fn merge_headers(&self, adapter_headers: HeaderMap) -> Result<HeaderMap> {
        let provider = self.resolved.provider().as_str();
        let invalid = |what: String| LlmError::invalid_request(provider, what);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.http.user_agent)
                .map_err(|_| invalid(format!("invalid user agent '{}'", self.http.user_agent)))?,
        );
        for (name, value) in &self.http.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| invalid(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| invalid(format!("invalid value for header '{name}': {e}")))?;
            headers.insert(name, value);
        }
        for (name, value) in adapter_headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }

    /// Phase 4, one suspending attempt bounded by the per-attempt timeout.
    async fn attempt(
        &self,
        request: &HttpTransportRequest,
        attempt: u32,
        tracer: &ProviderTracer,
    ) -> std::result::Result<Delivered, AttemptError> {
        debug!(phase = %DispatchPhase::Invoking, attempt);
        tracer.trace_request_start(&request.url, attempt);
        let started = Instant::now();
        let call = self.transport.execute_json(request.clone());
        let outcome = match tokio::time::timeout(request.timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::timeout(format!(
                "no response within {:?}",
                request.timeout
            ))),
        };
        self.check_response(outcome, attempt, tracer, started)
    }

    /// Phase 4, one blocking attempt. The transport enforces the timeout.
    fn attempt_blocking(
        &self,
        request: &HttpTransportRequest,
        attempt: u32,
        tracer: &ProviderTracer,
    ) -> std::result::Result<Delivered, AttemptError> {
        debug!(phase = %DispatchPhase::Invoking, attempt);
        tracer.trace_request_start(&request.url, attempt);
        let started = Instant::now();
        let outcome = self.blocking_transport.execute_json(request.clone());
        self.check_response(outcome, attempt, tracer, started)
    }

    /// Non-2xx statuses, and 2xx bodies that carry an error object, are
    /// classified by the adapter here so the retry executor can judge them.
    fn check_response(
        &self,
        outcome: std::result::Result<HttpTransportResponse, TransportError>,
        attempt: u32,
        tracer: &ProviderTracer,
        started: Instant,
    ) -> std::result::Result<Delivered, AttemptError> {
        let response = outcome.map_err(|error| {
            debug!(attempt, kind = ?error.kind, error = %error.message, "transport failure");
            AttemptError::Transport { error, attempt }
        })?;
        tracer.trace_response_status(response.status, started);
        if !response.is_success() {
            return Err(AttemptError::Provider(self.resolved.adapter().parse_error(
                response.status,
                &response.headers,
                &response.body_text(),
            )));
        }

        let delivered = Delivered::decode(response);
        if let Ok(body) = &delivered.body
            && let Some(error) = self.resolved.adapter().embedded_error(body)
        {
            debug!(attempt, kind = ?error.kind(), "error object in success body");
            return Err(AttemptError::Provider(error));
        }
        Ok(delivered)
    }

    /// Phase 5: normalize the decoded body.
    fn parse(&self, delivered: Delivered) -> Result<GenResponse> {
        debug!(phase = %DispatchPhase::Parsing, status = delivered.status);
        let provider = self.resolved.provider();
        let body = delivered.body.map_err(|(e, raw)| {
            LlmError::provider(provider.as_str(), format!("response body is not valid JSON: {e}"))
                .with_status(delivered.status)
                .with_details(serde_json::json!({ "raw": raw }))
        })?;

        let mut generated = self
            .resolved
            .adapter()
            .parse_response(&self.resolved.context, &body)?;
        if !self.resolved.warnings.is_empty() {
            let mut warnings = self.resolved.warnings.clone();
            warnings.append(&mut generated.warnings);
            generated.warnings = warnings;
        }
        if self.include_raw {
            generated.raw = Some(body);
        }
        debug!(phase = %DispatchPhase::Succeeded);
        Ok(generated)
    }
}
