//! HTTP transport abstraction.
//!
//! The dispatch core hands a fully built JSON POST to a transport and gets the
//! raw status, headers and body back. Callers can inject their own transport
//! (tests, proxies, custom TLS); the defaults are backed by `reqwest`.

use crate::retry::Retryable;
use crate::types::HttpConfig;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::sync::OnceLock;
use std::time::Duration;

/// Transport-level request data for JSON POST requests.
#[derive(Debug, Clone)]
pub struct HttpTransportRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
    /// Budget for this attempt
    pub timeout: Duration,
}

/// Transport-level response data.
#[derive(Debug, Clone)]
pub struct HttpTransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpTransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportErrorKind {
    /// No response within the attempt budget
    Timeout,
    /// Connection could not be established
    Connect,
    Other,
}

/// Failure below the HTTP layer: no status code was received.
#[derive(Debug, Clone, thiserror::Error)]
#[error("transport {kind:?} error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Connect,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Other,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(e.to_string())
        } else if e.is_connect() {
            Self::connect(e.to_string())
        } else {
            Self::other(e.to_string())
        }
    }
}

/// Timeouts and connection failures are transient.
impl Retryable for TransportError {
    fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Timeout | TransportErrorKind::Connect
        )
    }
}

/// Suspending transport.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute_json(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportResponse, TransportError>;
}

/// Blocking transport; runs on the caller's thread.
pub trait BlockingHttpTransport: Send + Sync {
    fn execute_json(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportResponse, TransportError>;
}

/// Build a `reqwest::Client` from `HttpConfig`.
///
/// Extra headers are not installed as client defaults; the dispatch core
/// merges them per request so adapter headers can take precedence.
pub fn build_http_client(config: &HttpConfig) -> Result<reqwest::Client, TransportError> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent);
    if let Some(proxy_url) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| TransportError::other(format!("invalid proxy URL: {e}")))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| TransportError::other(format!("failed to create HTTP client: {e}")))
}

/// Default async transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self, TransportError> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute_json(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportResponse, TransportError> {
        let response = self
            .client
            .post(&request.url)
            .headers(request.headers)
            .timeout(request.timeout)
            .json(&request.body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(HttpTransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Default blocking transport.
///
/// The `reqwest::blocking::Client` is built on first use so purely async
/// callers never start its internal runtime. Must not be called from inside
/// an async runtime.
#[derive(Debug)]
pub struct ReqwestBlockingTransport {
    config: HttpConfig,
    client: OnceLock<reqwest::blocking::Client>,
}

impl ReqwestBlockingTransport {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            config,
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, TransportError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(self.config.timeout)
            .connect_timeout(self.config.connect_timeout)
            .user_agent(&self.config.user_agent);
        if let Some(proxy_url) = &self.config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| TransportError::other(format!("invalid proxy URL: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::other(format!("failed to create HTTP client: {e}")))?;
        // A concurrent first call may have won the race; either client is fine.
        let _ = self.client.set(client);
        self.client
            .get()
            .ok_or_else(|| TransportError::other("HTTP client unavailable"))
    }
}

impl BlockingHttpTransport for ReqwestBlockingTransport {
    fn execute_json(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportResponse, TransportError> {
        let response = self
            .client()?
            .post(&request.url)
            .headers(request.headers)
            .timeout(request.timeout)
            .json(&request.body)
            .send()?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes()?.to_vec();
        Ok(HttpTransportResponse {
            status,
            headers,
            body,
        })
    }
}
