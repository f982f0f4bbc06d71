#![allow(dead_code)]

use async_trait::async_trait;
use llm_dispatch::auth::MapEnv;
use llm_dispatch::execution::{
    BlockingHttpTransport, HttpTransport, HttpTransportRequest, HttpTransportResponse,
    TransportError,
};
use llm_dispatch::{LlmClient, ProviderConfig, RetryPolicy};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted transport outcome.
#[derive(Debug, Clone)]
pub enum Reply {
    Json {
        status: u16,
        body: Value,
        headers: Vec<(&'static str, &'static str)>,
    },
    Text {
        status: u16,
        body: String,
    },
    Fail(TransportError),
    /// Never answers (async); reports a timeout (blocking).
    Hang,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: Value) -> Self {
        Self::Json {
            status,
            body,
            headers: Vec::new(),
        }
    }

    pub fn with_header(self, name: &'static str, value: &'static str) -> Self {
        match self {
            Self::Json {
                status,
                body,
                mut headers,
            } => {
                headers.push((name, value));
                Self::Json {
                    status,
                    body,
                    headers,
                }
            }
            other => other,
        }
    }

    fn into_response(self) -> Result<HttpTransportResponse, TransportError> {
        match self {
            Self::Json {
                status,
                body,
                headers,
            } => {
                let mut map = HeaderMap::new();
                for (k, v) in headers {
                    map.insert(HeaderName::from_static(k), HeaderValue::from_static(v));
                }
                Ok(HttpTransportResponse {
                    status,
                    headers: map,
                    body: serde_json::to_vec(&body).expect("json bytes"),
                })
            }
            Self::Text { status, body } => Ok(HttpTransportResponse {
                status,
                headers: HeaderMap::new(),
                body: body.into_bytes(),
            }),
            Self::Fail(error) => Err(error),
            Self::Hang => Err(TransportError::timeout("no response")),
        }
    }
}

#[derive(Default)]
struct Script {
    calls: Vec<HttpTransportRequest>,
    queue: VecDeque<Reply>,
    repeat: Option<Reply>,
}

/// Records every request and answers from a script. Implements both
/// transport traits so the blocking and async paths see identical replies.
#[derive(Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
}

impl MockTransport {
    /// Same reply for every call.
    pub fn always(reply: Reply) -> Self {
        let transport = Self::default();
        transport.script.lock().expect("lock").repeat = Some(reply);
        transport
    }

    /// Replies in order; the last one repeats once the queue is drained.
    pub fn sequence(replies: impl IntoIterator<Item = Reply>) -> Self {
        let transport = Self::default();
        {
            let mut script = transport.script.lock().expect("lock");
            script.queue = replies.into_iter().collect();
            script.repeat = script.queue.back().cloned();
        }
        transport
    }

    pub fn calls(&self) -> Vec<HttpTransportRequest> {
        self.script.lock().expect("lock").calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.script.lock().expect("lock").calls.len()
    }

    fn next(&self, request: HttpTransportRequest) -> Reply {
        let mut script = self.script.lock().expect("lock");
        script.calls.push(request);
        match script.queue.pop_front() {
            Some(reply) => reply,
            None => script
                .repeat
                .clone()
                .unwrap_or_else(|| Reply::Fail(TransportError::other("no scripted reply"))),
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute_json(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportResponse, TransportError> {
        match self.next(request) {
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(TransportError::other("hang outlived the test"))
            }
            reply => reply.into_response(),
        }
    }
}

impl BlockingHttpTransport for MockTransport {
    fn execute_json(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportResponse, TransportError> {
        self.next(request).into_response()
    }
}

/// Millisecond backoff so retry tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new()
        .with_initial_delay(Duration::from_millis(1))
        .with_max_delay(Duration::from_millis(20))
        .with_jitter(false)
}

/// Client wired to `transport` for both call shapes, with an empty environment.
pub fn client(config: ProviderConfig, transport: &MockTransport) -> LlmClient {
    LlmClient::builder(config)
        .transport(Arc::new(transport.clone()))
        .blocking_transport(Arc::new(transport.clone()))
        .retry_policy(fast_retry())
        .env(MapEnv::new())
        .build()
        .expect("client builds")
}

pub fn chat_completion(text: &str, usage: Option<(u32, u32, u32)>) -> Value {
    let mut body = json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "served-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    });
    if let Some((p, c, t)) = usage {
        body["usage"] = json!({"prompt_tokens": p, "completion_tokens": c, "total_tokens": t});
    }
    body
}

pub fn anthropic_message(text: &str, input: u32, output: u32) -> Value {
    json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "model": "claude-sonnet-4-5-20250929",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": {"input_tokens": input, "output_tokens": output}
    })
}

pub fn gemini_content(text: &str, usage: (u32, u32, u32)) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP",
            "index": 0
        }],
        "usageMetadata": {
            "promptTokenCount": usage.0,
            "candidatesTokenCount": usage.1,
            "totalTokenCount": usage.2
        },
        "modelVersion": "gemini-2.5-flash"
    })
}

/// Canonical success payload for a provider id.
pub fn canonical_payload(provider: &str, text: &str) -> Value {
    match provider {
        "anthropic" => anthropic_message(text, 5, 1),
        "gemini" => gemini_content(text, (5, 1, 6)),
        _ => chat_completion(text, Some((5, 1, 6))),
    }
}
