//! Per-provider request/response alignment through a recording transport.

mod support;

use llm_dispatch::{FinishReason, GenParams, Prompt, ProviderConfig, ProviderId, Usage};
use serde_json::json;
use support::{MockTransport, Reply, anthropic_message, canonical_payload, chat_completion, client};

fn prompt() -> Prompt {
    Prompt::new("You are helpful.", "2+2?")
}

struct Case {
    provider: &'static str,
    model: &'static str,
    id: ProviderId,
    url: &'static str,
    auth_header: &'static str,
    auth_value: &'static str,
}

const CASES: [Case; 5] = [
    Case {
        provider: "openai",
        model: "gpt-4o",
        id: ProviderId::OpenAi,
        url: "https://api.openai.com/v1/chat/completions",
        auth_header: "authorization",
        auth_value: "Bearer k-openai",
    },
    Case {
        provider: "anthropic",
        model: "claude-sonnet-4-5",
        id: ProviderId::Anthropic,
        url: "https://api.anthropic.com/v1/messages",
        auth_header: "x-api-key",
        auth_value: "k-anthropic",
    },
    Case {
        provider: "gemini",
        model: "gemini-2.5-flash",
        id: ProviderId::Gemini,
        url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent",
        auth_header: "x-goog-api-key",
        auth_value: "k-gemini",
    },
    Case {
        provider: "xai",
        model: "grok-4",
        id: ProviderId::Xai,
        url: "https://api.x.ai/v1/chat/completions",
        auth_header: "authorization",
        auth_value: "Bearer k-xai",
    },
    Case {
        provider: "openrouter",
        model: "openai/gpt-4o",
        id: ProviderId::OpenRouter,
        url: "https://openrouter.ai/api/v1/chat/completions",
        auth_header: "authorization",
        auth_value: "Bearer k-openrouter",
    },
];

#[tokio::test]
async fn every_provider_normalizes_to_the_same_shape() {
    for case in &CASES {
        let transport = MockTransport::always(Reply::ok(canonical_payload(case.provider, "4")));
        let key = case.auth_value.trim_start_matches("Bearer ");
        let client = client(
            ProviderConfig::new(case.provider, case.model).with_api_key(key),
            &transport,
        );

        let response = client
            .generate(&prompt(), &GenParams::new().with_max_tokens(16))
            .await
            .unwrap_or_else(|e| panic!("{} failed: {e}", case.provider));

        assert_eq!(response.text, "4", "{}", case.provider);
        assert_eq!(response.provider, case.id);
        assert_eq!(response.model, case.model);
        assert_eq!(response.finish_reason, Some(FinishReason::Stop), "{}", case.provider);
        assert_eq!(response.usage, Some(Usage::new(5, 1, 6)), "{}", case.provider);
        assert!(response.warnings.is_empty(), "{}", case.provider);

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, case.url);
        assert_eq!(calls[0].headers[case.auth_header], case.auth_value);
        assert_eq!(calls[0].headers["content-type"], "application/json");
    }
}

#[test]
fn blocking_calls_send_the_same_requests() {
    for case in &CASES {
        let transport = MockTransport::always(Reply::ok(canonical_payload(case.provider, "4")));
        let client = client(
            ProviderConfig::new(case.provider, case.model).with_api_key("k"),
            &transport,
        );

        let response = client
            .generate_blocking(&prompt(), &GenParams::new())
            .unwrap_or_else(|e| panic!("{} failed: {e}", case.provider));
        assert_eq!(response.text, "4");
        assert_eq!(transport.calls()[0].url, case.url);
    }
}

#[tokio::test]
async fn openai_two_plus_two_scenario() {
    let transport = MockTransport::always(Reply::ok(json!({
        "id": "chatcmpl-1",
        "model": "gpt-4o-2024-08-06",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "4"}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 5, "completion_tokens": 1, "total_tokens": 6}
    })));
    let client = client(ProviderConfig::new("openai", "gpt-4o").with_api_key("k"), &transport);

    let response = client
        .generate(&prompt(), &GenParams::new().with_max_tokens(16).with_temperature(0.0))
        .await
        .unwrap();

    assert_eq!(response.text, "4");
    assert_eq!(response.provider, ProviderId::OpenAi);
    assert_eq!(response.model, "gpt-4o");
    assert_eq!(response.served_model.as_deref(), Some("gpt-4o-2024-08-06"));
    let usage = response.usage.unwrap();
    assert_eq!(usage.prompt_tokens, Some(5));
    assert_eq!(usage.completion_tokens, Some(1));
    assert_eq!(usage.total_tokens, Some(6));

    let body = &transport.calls()[0].body;
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["max_tokens"], 16);
    assert_eq!(body["messages"][0], json!({"role": "system", "content": "You are helpful."}));
    assert_eq!(body["messages"][1], json!({"role": "user", "content": "2+2?"}));
}

#[tokio::test]
async fn anthropic_places_instructions_in_system_field() {
    let transport = MockTransport::always(Reply::ok(anthropic_message("4", 10, 1)));
    let client = client(
        ProviderConfig::new("anthropic", "claude-sonnet-4-5").with_api_key("k"),
        &transport,
    );

    let response = client.generate(&prompt(), &GenParams::new()).await.unwrap();
    assert_eq!(response.usage, Some(Usage::new(10, 1, 11)));

    let call = &transport.calls()[0];
    assert_eq!(call.body["system"], "You are helpful.");
    assert_eq!(call.body["messages"], json!([{"role": "user", "content": "2+2?"}]));
    assert_eq!(call.body["max_tokens"], 4096);
    assert_eq!(call.headers["anthropic-version"], "2023-06-01");
}

#[tokio::test]
async fn gemini_sends_generation_config() {
    let transport = MockTransport::always(Reply::ok(canonical_payload("gemini", "4")));
    let client = client(
        ProviderConfig::new("gemini", "gemini-2.5-flash").with_api_key("k"),
        &transport,
    );

    client
        .generate(
            &prompt(),
            &GenParams::new()
                .with_max_tokens(32)
                .with_stop_sequences(["END"]),
        )
        .await
        .unwrap();

    let body = &transport.calls()[0].body;
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are helpful.");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "2+2?");
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 32);
    assert_eq!(body["generationConfig"]["stopSequences"], json!(["END"]));
}

#[tokio::test]
async fn zero_choices_yield_empty_text() {
    let transport = MockTransport::always(Reply::ok(json!({
        "id": "chatcmpl-1",
        "model": "gpt-4o",
        "choices": []
    })));
    let client = client(ProviderConfig::new("openai", "gpt-4o").with_api_key("k"), &transport);

    let response = client.generate(&prompt(), &GenParams::new()).await.unwrap();
    assert_eq!(response.text, "");
    assert_eq!(response.usage, None);
    assert_eq!(response.finish_reason, None);
}

#[tokio::test]
async fn missing_usage_is_absent_not_zero() {
    let transport = MockTransport::always(Reply::ok(chat_completion("hi", None)));
    let client = client(ProviderConfig::new("xai", "grok-4").with_api_key("k"), &transport);

    let response = client.generate(&prompt(), &GenParams::new()).await.unwrap();
    assert_eq!(response.text, "hi");
    assert!(response.usage.is_none());
}

#[tokio::test]
async fn openrouter_attribution_headers_are_sent() {
    let transport = MockTransport::always(Reply::ok(canonical_payload("openrouter", "ok")));
    let client = client(
        ProviderConfig::new("openrouter", "anthropic/claude-sonnet-4.5")
            .with_api_key("k")
            .with_extra("http_referer", "https://example.com")
            .with_extra("x_title", "demo"),
        &transport,
    );

    client.generate(&prompt(), &GenParams::new()).await.unwrap();
    let call = &transport.calls()[0];
    assert_eq!(call.headers["http-referer"], "https://example.com");
    assert_eq!(call.headers["x-title"], "demo");
    assert!(call.body.get("http_referer").is_none());
}

#[tokio::test]
async fn base_url_override_redirects_requests() {
    let transport = MockTransport::always(Reply::ok(canonical_payload("openai", "ok")));
    let client = client(
        ProviderConfig::new("openai", "gpt-4o")
            .with_api_key("k")
            .with_base_url("http://localhost:8080/v1/"),
        &transport,
    );

    client.generate(&prompt(), &GenParams::new()).await.unwrap();
    assert_eq!(transport.calls()[0].url, "http://localhost:8080/v1/chat/completions");
}
