//! Tests for plotgraph-llm: request types, parameter clamping, tool-call extraction,
//! and the OpenAI-compatible provider against a local HTTP stub

use plotgraph_llm::*;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// ===========================================================================
// GenerationParams
// ===========================================================================

#[test]
fn params_default_when_absent() {
    let p = GenerationParams::resolve(None, None, None);
    assert_eq!(p.max_tokens, 16384);
    assert_eq!(p.temperature, 0.3);
    assert_eq!(p.top_p, 0.8);
    assert_eq!(p, GenerationParams::default());
}

#[test]
fn params_clamped_into_range() {
    let p = GenerationParams::resolve(Some(0), Some(-1.0), Some(5.0));
    assert_eq!(p.max_tokens, 1);
    assert_eq!(p.temperature, 0.0);
    assert_eq!(p.top_p, 1.0);

    let p = GenerationParams::resolve(Some(512), Some(1.7), Some(0.0));
    assert_eq!(p.max_tokens, 512);
    assert_eq!(p.temperature, 1.7);
    assert_eq!(p.top_p, f64::EPSILON);
}

#[test]
fn params_non_finite_fall_back() {
    let p = GenerationParams::resolve(None, Some(f64::NAN), Some(f64::INFINITY));
    assert_eq!(p.temperature, 0.3);
    assert_eq!(p.top_p, 0.8);
}

// ===========================================================================
// CompletionRequest
// ===========================================================================

fn route_tool() -> FunctionTool {
    FunctionTool::new(
        "route",
        "Pick the next node",
        json!({"type": "object", "properties": {"next": {"type": "string"}}}),
    )
}

#[test]
fn force_tool_serializes_function_choice() {
    let req = CompletionRequest::new("m", vec![ChatMessage::user("hi")], GenerationParams::default())
        .force_tool(route_tool());
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["tool_choice"], json!({"type": "function", "function": {"name": "route"}}));
    assert_eq!(v["tools"][0]["type"], "function");
    assert_eq!(v["tools"][0]["function"]["name"], "route");
    assert_eq!(v["messages"][0], json!({"role": "user", "content": "hi"}));
    assert_eq!(v["max_tokens"], 16384);
}

#[test]
fn request_without_tools_omits_fields() {
    let req = CompletionRequest::new("m", vec![], GenerationParams::default());
    let v = serde_json::to_value(&req).unwrap();
    assert!(v.get("tools").is_none());
    assert!(v.get("tool_choice").is_none());
    assert!(req.effective_tool_choice().is_none());
}

#[test]
fn effective_tool_choice_defaults_to_first_tool() {
    let mut req = CompletionRequest::new("m", vec![], GenerationParams::default());
    req.tools = Some(vec![route_tool()]);
    assert_eq!(req.effective_tool_choice(), Some(ToolChoice::Function("route".into())));
}

#[test]
fn tool_choice_auto_is_a_string() {
    assert_eq!(serde_json::to_value(ToolChoice::Auto).unwrap(), json!("auto"));
}

// ===========================================================================
// extract_tool_call
// ===========================================================================

fn reply_with_calls(calls: serde_json::Value) -> CompletionReply {
    serde_json::from_value(json!({
        "model": "m",
        "choices": [{"message": {"content": null, "tool_calls": calls}, "finish_reason": "tool_calls"}]
    }))
    .unwrap()
}

#[test]
fn extract_merges_all_matching_calls() {
    let reply = reply_with_calls(json!([
        {"id": "a", "function": {"name": "fill", "arguments": "{\"x\":\"Category\"}"}},
        {"id": "b", "function": {"name": "other", "arguments": "{\"z\":1}"}},
        {"id": "c", "function": {"name": "fill", "arguments": "{\"y\":\"Age\"}"}}
    ]));
    let args = extract_tool_call("fill", &reply).unwrap();
    assert_eq!(args.len(), 2);
    assert_eq!(args["x"], "Category");
    assert_eq!(args["y"], "Age");
}

#[test]
fn extract_skips_unparseable_arguments() {
    let reply = reply_with_calls(json!([
        {"id": "a", "function": {"name": "fill", "arguments": "{not json"}},
        {"id": "b", "function": {"name": "fill", "arguments": "{\"x\":\"A\"}"}}
    ]));
    let args = extract_tool_call("fill", &reply).unwrap();
    assert_eq!(args["x"], "A");
}

#[test]
fn extract_empty_arguments_yield_empty_map() {
    let reply = reply_with_calls(json!([{"id": "a", "function": {"name": "fill", "arguments": ""}}]));
    assert!(extract_tool_call("fill", &reply).unwrap().is_empty());
}

#[test]
fn extract_missing_call_is_none() {
    assert!(extract_tool_call("fill", &CompletionReply::text("I think a bar chart")).is_none());
    assert!(extract_tool_call("fill", &CompletionReply::default()).is_none());
}

#[test]
fn with_tool_call_round_trips() {
    let reply = CompletionReply::with_tool_call("route", &json!({"next": "done"}));
    assert_eq!(extract_tool_call("route", &reply).unwrap()["next"], "done");
}

// ===========================================================================
// OpenAiProvider (local stub server)
// ===========================================================================

/// Serve exactly one HTTP response and hand back the raw request.
async fn serve_once(status: &'static str, body: String) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = sock.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower.strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        sock.write_all(response.as_bytes()).await.unwrap();
        sock.shutdown().await.ok();
        String::from_utf8_lossy(&buf).to_string()
    });
    (format!("http://{}", addr), handle)
}

fn forced_request() -> CompletionRequest {
    CompletionRequest::new("test-model", vec![ChatMessage::system("route")], GenerationParams::default())
        .force_tool(route_tool())
}

#[test]
fn endpoint_trims_trailing_slash() {
    let p = OpenAiProvider::new("k").with_base_url("http://host/v1/");
    assert_eq!(p.endpoint(), "http://host/v1/chat/completions");
    assert_eq!(p.name(), "openai");
}

#[tokio::test]
async fn provider_posts_and_parses_reply() {
    let body = json!({
        "model": "test-model",
        "choices": [{"message": {"tool_calls": [
            {"id": "c1", "function": {"name": "route", "arguments": "{\"next\":\"done\"}"}}
        ]}}]
    })
    .to_string();
    let (base, server) = serve_once("200 OK", body).await;
    let provider = OpenAiProvider::new("secret").with_base_url(base);

    let reply = provider.complete(forced_request()).await.unwrap();
    assert_eq!(extract_tool_call("route", &reply).unwrap()["next"], "done");

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /chat/completions"));
    assert!(raw.to_ascii_lowercase().contains("authorization: bearer secret"));
    assert!(raw.contains("\"tool_choice\""));
}

#[tokio::test]
async fn provider_maps_auth_failure() {
    let (base, _server) = serve_once("401 Unauthorized", "{\"error\":\"bad key\"}".into()).await;
    let provider = OpenAiProvider::new("bad").with_base_url(base);
    let err = provider.complete(forced_request()).await.unwrap_err();
    assert!(matches!(err, LlmError::AuthFailed(_)));
}

#[tokio::test]
async fn provider_maps_rate_limit() {
    let (base, _server) = serve_once("429 Too Many Requests", "{}".into()).await;
    let provider = OpenAiProvider::new("k").with_base_url(base);
    let err = provider.complete(forced_request()).await.unwrap_err();
    assert!(matches!(err, LlmError::RateLimited { retry_after_ms: 60000 }));
}

#[tokio::test]
async fn provider_rejects_malformed_body() {
    let (base, _server) = serve_once("200 OK", "not json".into()).await;
    let provider = OpenAiProvider::new("k").with_base_url(base);
    let err = provider.complete(forced_request()).await.unwrap_err();
    assert!(matches!(err, LlmError::InvalidResponse(_)));
}

#[test]
fn llm_error_converts_to_core_error() {
    let e: plotgraph_core::Error = LlmError::RequestFailed("500".into()).into();
    assert!(matches!(e, plotgraph_core::Error::Llm { .. }));
}
