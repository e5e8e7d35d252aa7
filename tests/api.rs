use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use search_agent::agent::Agent;
use search_agent::api::{router, AppState};
use search_agent::config::Config;
use search_agent::llm::{AssistantMessage, LlmClient, LlmError, Message, ToolSchema};
use search_agent::tools::ToolRegistry;

/// Answers with the user's text reversed, or fails when told to.
struct ReverseLlm;

#[async_trait]
impl LlmClient for ReverseLlm {
    async fn chat_completion(
        &self,
        _model: &str,
        messages: &[Message],
        _tools: &[ToolSchema],
    ) -> Result<AssistantMessage, LlmError> {
        let text = match messages.last() {
            Some(Message::User { content }) => content.clone(),
            _ => String::new(),
        };
        if text == "fail" {
            return Err(LlmError::Unavailable("connection refused".to_string()));
        }
        Ok(AssistantMessage::text(text.chars().rev().collect::<String>()))
    }
}

fn app(frontend_dir: &Path) -> Router {
    let config = Config::new(
        "test-key".to_string(),
        "http://localhost:1/v1".to_string(),
        "test-model".to_string(),
    );
    let agent = Agent::with_parts(config, Arc::new(ReverseLlm), Arc::new(ToolRegistry::new()));
    router(Arc::new(AppState { agent }), frontend_dir)
}

fn no_frontend() -> Router {
    app(Path::new("/nonexistent/frontend"))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_chat(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let response = no_frontend()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn chat_returns_final_answer() {
    let response = no_frontend()
        .oneshot(post_chat(json!({"message": "Hello"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"response": "olleH"}));
}

#[tokio::test]
async fn chat_failure_is_500_with_detail() {
    let response = no_frontend()
        .oneshot(post_chat(json!({"message": "fail"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(
        body["detail"],
        "Language model unavailable: connection refused"
    );
}

#[tokio::test]
async fn chat_rejects_malformed_body() {
    let response = no_frontend()
        .oneshot(post_chat(json!({"text": "wrong field"})))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let response = no_frontend()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .header(header::ORIGIN, "https://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

#[tokio::test]
async fn serves_frontend_when_present() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>chat</h1>").unwrap();

    let response = app(dir.path())
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<h1>chat</h1>");
}

#[tokio::test]
async fn unknown_path_without_frontend_is_404() {
    let response = no_frontend()
        .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bundled_frontend_posts_to_chat() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("frontend");

    let response = app(&dir)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8_lossy(&page);
    assert!(page.contains("id=\"chat-messages\""));
    assert!(page.contains("app.js"));

    let response = app(&dir)
        .oneshot(Request::builder().uri("/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let script = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&script).contains("fetch('/chat'"));
}
