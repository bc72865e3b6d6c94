//! End-to-end tests: a preview trigger talking to a real dashgen server, which
//! talks to a mock completion API. Everything runs over loopback sockets.

use axum::{Json, Router, http::StatusCode, routing::post};
use dashgen::client::create_hyper_client;
use dashgen::completion::Upstream;
use dashgen::preview::{PreviewError, PreviewOutcome, PreviewTrigger, StaticPage};
use dashgen::{AppState, build_router};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower::util::ServiceExt; // for oneshot()

type Seen = Arc<Mutex<Vec<Value>>>;

async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

/// A completion API that answers every request with `content` and keeps the bodies it saw.
async fn spawn_mock_llm(content: &'static str) -> (String, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |Json(body): Json<Value>| {
            let recorded = Arc::clone(&recorded);
            async move {
                recorded.lock().unwrap().push(body);
                Json(json!({
                    "id": "chatcmpl-mock",
                    "object": "chat.completion",
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
                }))
            }
        }),
    );
    let base = spawn(app).await;
    (format!("{base}v1/"), seen)
}

fn upstream(url: &str) -> Upstream {
    Upstream::builder()
        .url(url.parse().unwrap())
        .api_key("gsk-test".to_string())
        .model("mock-model")
        .build()
}

async fn spawn_dashgen(upstream_url: &str) -> String {
    let state = AppState::new(upstream(upstream_url));
    spawn(build_router(state)).await
}

#[tokio::test]
async fn preview_renders_generated_dashboard() {
    let (llm_url, seen) = spawn_mock_llm("```html\n<html><h1>Spending</h1></html>\n```").await;
    let server = spawn_dashgen(&llm_url).await;

    let trigger = PreviewTrigger::new(create_hyper_client(), server.parse().unwrap());
    let mut page = StaticPage::new(
        r#"{"report_title": "Spending", "expenses": [{"amount": 5}, {"amount": 7.5}]}"#,
        "two cards and a table",
    );

    let outcome = trigger.generate_dashboard(&mut page).await.unwrap();

    assert_eq!(outcome, PreviewOutcome::Rendered);
    assert_eq!(page.preview(), Some("<html><h1>Spending</h1></html>"));
    assert!(page.notifications().is_empty());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["model"], "mock-model");
    let user = seen[0]["messages"][1]["content"].as_str().unwrap();
    assert!(user.contains("\"total_spending\": \"12.50\""));
    assert!(user.contains("two cards and a table"));
}

#[tokio::test]
async fn preview_surfaces_invalid_json_as_notification() {
    let (llm_url, seen) = spawn_mock_llm("<html></html>").await;
    let server = spawn_dashgen(&llm_url).await;

    let trigger = PreviewTrigger::new(create_hyper_client(), server.parse().unwrap());
    let mut page = StaticPage::new("not json", "anything").with_preview("<p>before</p>");

    let outcome = trigger.generate_dashboard(&mut page).await.unwrap();

    let PreviewOutcome::Rejected(error) = outcome else {
        panic!("expected a rejection, got {outcome:?}");
    };
    assert!(error.starts_with("Invalid JSON: "));
    assert_eq!(page.notifications(), [error.as_str()]);
    assert_eq!(page.preview(), Some("<p>before</p>"));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn preview_reports_unreachable_upstream_as_rejection() {
    // Nothing listens on port 1.
    let server = spawn_dashgen("http://127.0.0.1:1/v1/").await;

    let trigger = PreviewTrigger::new(create_hyper_client(), server.parse().unwrap());
    let mut page = StaticPage::new("{}", "");

    let outcome = trigger.generate_dashboard(&mut page).await.unwrap();

    assert!(matches!(outcome, PreviewOutcome::Rejected(ref e) if e.starts_with("Upstream error")));
    assert_eq!(page.preview(), None);
}

#[tokio::test]
async fn preview_fails_when_server_is_unreachable() {
    let trigger = PreviewTrigger::new(
        create_hyper_client(),
        "http://127.0.0.1:1".parse().unwrap(),
    );
    let mut page = StaticPage::new("{}", "").with_preview("<p>before</p>");

    let err = trigger.generate_dashboard(&mut page).await.unwrap_err();

    assert!(matches!(err, PreviewError::Transport(_)));
    assert_eq!(page.preview(), Some("<p>before</p>"));
    assert!(page.notifications().is_empty());
}

#[tokio::test]
async fn generate_rejects_wrong_method() {
    let app = build_router(AppState::new(upstream("http://127.0.0.1:1/v1/")));

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/generate")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
