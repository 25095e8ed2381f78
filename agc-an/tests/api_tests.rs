//! Integration tests for agc-an API endpoints
//!
//! The router is driven with `oneshot` requests. Analysis requests go to a
//! fake OpenAI-compatible upstream served by axum on an ephemeral port, which
//! records every request it receives.

use agc_an::{build_router, AppState};
use agc_common::config::TomlConfig;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot` method

const WATER_APP: &str = "I want to create an iOS app that helps users track their daily water intake. \
    The app will send notifications, allow users to log their drinks, and provide insights about their hydration habits.";

// =============================================================================
// Fake upstream
// =============================================================================

#[derive(Debug, Clone)]
struct CapturedRequest {
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct FakeUpstream {
    status: StatusCode,
    body: Value,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl FakeUpstream {
    fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn fake_completion(
    State(fake): State<FakeUpstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    fake.requests
        .lock()
        .unwrap()
        .push(CapturedRequest { authorization, body });

    (fake.status, Json(fake.body.clone()))
}

/// Start a fake chat completion server; returns its base URL
async fn spawn_upstream(status: StatusCode, body: Value) -> (String, FakeUpstream) {
    let fake = FakeUpstream {
        status,
        body,
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new()
        .route("/v1/chat/completions", post(fake_completion))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind fake upstream");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1", addr), fake)
}

/// Start an upstream that answers only after `delay`; returns its base URL
async fn spawn_slow_upstream(delay: Duration) -> String {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move || async move {
            tokio::time::sleep(delay).await;
            Json(completion(json!("{}")))
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind slow upstream");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/v1", addr)
}

/// Chat completion envelope around `content`
fn completion(content: Value) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

// =============================================================================
// Helpers
// =============================================================================

/// Test helper: app wired to `base_url` with a test API key
fn setup_app(base_url: &str) -> Router {
    let mut config = TomlConfig::default();
    config.openai.base_url = base_url.to_string();
    config.openai.timeout_secs = 5;

    let state = AppState::from_config(&config, Some("sk-test".to_string()))
        .expect("Should build state");
    build_router(state)
}

/// Test helper: app with a one second upstream timeout
fn setup_app_with_short_timeout(base_url: &str) -> Router {
    let mut config = TomlConfig::default();
    config.openai.base_url = base_url.to_string();
    config.openai.timeout_secs = 1;

    let state = AppState::from_config(&config, Some("sk-test".to_string()))
        .expect("Should build state");
    build_router(state)
}

/// Test helper: app with no API key configured
fn setup_unconfigured_app() -> Router {
    let state = AppState::from_config(&TomlConfig::default(), None).expect("Should build state");
    build_router(state)
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn analyze_request(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn analyze_idea(idea: &str) -> Request<Body> {
    analyze_request(json!({ "appIdea": idea }).to_string())
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn extract_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Should be UTF-8")
}

// =============================================================================
// Health, build info and UI
// =============================================================================

#[tokio::test]
async fn test_health_ok_when_configured() {
    let app = setup_app("http://127.0.0.1:9/v1");

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "agc-an");
    assert_eq!(body["model"], "gpt-4-turbo-preview");
    assert!(body["version"].is_string());
    assert!(body["uptime_seconds"].is_number());
    assert!(body.get("last_error").is_none());
}

#[tokio::test]
async fn test_health_degraded_without_api_key() {
    let app = setup_unconfigured_app();

    let response = app.oneshot(get_request("/health")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["status"], "degraded");
    assert!(body.get("model").is_none());
}

#[tokio::test]
async fn test_buildinfo() {
    let app = setup_unconfigured_app();

    let response = app.oneshot(get_request("/api/buildinfo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["git_hash"].is_string());
    assert!(body["build_timestamp"].is_string());
    assert!(body["build_profile"].is_string());
}

#[tokio::test]
async fn test_index_page_served() {
    let app = setup_unconfigured_app();

    let response = app.oneshot(get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = extract_text(response.into_body()).await;
    assert!(html.contains("<title>App Store Guidelines Checker</title>"));
    assert!(html.contains("Describe your app idea in detail"));
    assert!(html.contains("/static/app.js"));
}

#[tokio::test]
async fn test_app_js_served() {
    let app = setup_unconfigured_app();

    let response = app.oneshot(get_request("/static/app.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/javascript"
    );

    let js = extract_text(response.into_body()).await;
    assert!(js.contains("/api/analyze"));
    assert!(js.contains("/api/analyze/limits"));
    assert!(js.contains("Confidence:"));
}

#[tokio::test]
async fn test_limits_follow_configuration() {
    let mut config = TomlConfig::default();
    config.analysis.min_idea_chars = 20;
    config.analysis.max_idea_chars = 500;
    let state = AppState::from_config(&config, None).expect("Should build state");
    let app = build_router(state);

    let response = app.oneshot(get_request("/api/analyze/limits")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["minIdeaChars"], 20);
    assert_eq!(body["maxIdeaChars"], 500);
}

// =============================================================================
// Analysis
// =============================================================================

#[tokio::test]
async fn test_analyze_returns_normalized_report() {
    let model_reply = json!({
        "violations": [
            { "guideline": "4.2 Minimum Functionality", "explanation": "Simple tracker", "probability": 0.45 },
            { "guideline": "2.5.4 Background Notifications", "explanation": "Reminders", "probability": 0.2 },
            { "guideline": "5.1.1 Data Collection and Storage", "explanation": "Health data", "probability": 0.75 }
        ],
        "isCompliant": false
    })
    .to_string();
    let (base_url, _upstream) = spawn_upstream(StatusCode::OK, completion(json!(model_reply))).await;
    let app = setup_app(&base_url);

    let response = app.oneshot(analyze_idea(WATER_APP)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["isCompliant"], false);

    let violations = body["violations"].as_array().unwrap();
    assert_eq!(violations.len(), 2, "0.2 is below the reporting threshold");
    assert_eq!(violations[0]["guideline"], "5.1.1 Data Collection and Storage");
    assert_eq!(violations[0]["probability"], 0.75);
    assert_eq!(violations[1]["guideline"], "4.2 Minimum Functionality");
}

#[tokio::test]
async fn test_analyze_sends_expected_upstream_request() {
    let reply = json!({ "violations": [], "isCompliant": true }).to_string();
    let (base_url, upstream) = spawn_upstream(StatusCode::OK, completion(json!(reply))).await;
    let app = setup_app(&base_url);

    let padded = format!("   {}\n\n", WATER_APP);
    let response = app.oneshot(analyze_idea(&padded)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let requests = upstream.requests();
    assert_eq!(requests.len(), 1, "exactly one upstream call per submission");

    let request = &requests[0];
    assert_eq!(request.authorization.as_deref(), Some("Bearer sk-test"));
    assert_eq!(request.body["model"], "gpt-4-turbo-preview");
    assert_eq!(request.body["response_format"]["type"], "json_object");
    assert!((request.body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);

    let messages = request.body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert!(messages[0]["content"]
        .as_str()
        .unwrap()
        .contains("App Store Review Guidelines"));
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], WATER_APP);
}

#[tokio::test]
async fn test_analyze_empty_model_content_is_compliant() {
    let (base_url, _upstream) = spawn_upstream(StatusCode::OK, completion(Value::Null)).await;
    let app = setup_app(&base_url);

    let response = app.oneshot(analyze_idea(WATER_APP)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["isCompliant"], true);
    assert_eq!(body["violations"], json!([]));
}

#[tokio::test]
async fn test_analyze_rejects_short_idea_without_upstream_call() {
    let (base_url, upstream) = spawn_upstream(StatusCode::OK, completion(json!("{}"))).await;
    let app = setup_app(&base_url);

    let response = app.oneshot(analyze_idea("A todo list app.")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(
        body["error"]["message"],
        "App idea should be at least 50 characters long to provide enough context for analysis."
    );
    assert!(upstream.requests().is_empty());
}

#[tokio::test]
async fn test_analyze_rejects_missing_field() {
    let app = setup_unconfigured_app();

    let response = app
        .oneshot(analyze_request(json!({ "idea": WATER_APP }).to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_analyze_rejects_malformed_json() {
    let app = setup_unconfigured_app();

    let response = app
        .oneshot(analyze_request("{\"appIdea\": ".to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_rejects_oversized_body() {
    let app = setup_unconfigured_app();

    let huge = "x".repeat(agc_an::MAX_BODY_BYTES + 1);
    let response = app.oneshot(analyze_idea(&huge)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_analyze_unavailable_without_api_key() {
    let app = setup_unconfigured_app();

    let response = app.oneshot(analyze_idea(WATER_APP)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_upstream_failure_is_500_and_recorded() {
    let (base_url, _upstream) = spawn_upstream(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": { "message": "The server had an error" } }),
    )
    .await;
    let app = setup_app(&base_url);

    let response = app.clone().oneshot(analyze_idea(WATER_APP)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    assert_eq!(body["error"]["message"], "Failed to analyze app idea");

    // Upstream detail is only visible through /health
    let health = app.oneshot(get_request("/health")).await.unwrap();
    let health = extract_json(health.into_body()).await;
    let last_error = health["last_error"].as_str().unwrap();
    assert!(last_error.contains("API error 500"), "got: {}", last_error);
}

#[tokio::test]
async fn test_upstream_unauthorized_is_500() {
    let (base_url, _upstream) = spawn_upstream(
        StatusCode::UNAUTHORIZED,
        json!({ "error": { "message": "Incorrect API key provided" } }),
    )
    .await;
    let app = setup_app(&base_url);

    let response = app.clone().oneshot(analyze_idea(WATER_APP)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let health = app.oneshot(get_request("/health")).await.unwrap();
    let health = extract_json(health.into_body()).await;
    assert!(health["last_error"]
        .as_str()
        .unwrap()
        .contains("Invalid API key"));
}

#[tokio::test]
async fn test_non_json_model_reply_is_500() {
    let (base_url, _upstream) = spawn_upstream(
        StatusCode::OK,
        completion(json!("Sorry, I can't analyze that.")),
    )
    .await;
    let app = setup_app(&base_url);

    let response = app.oneshot(analyze_idea(WATER_APP)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_completion_without_choices_is_500() {
    let (base_url, _upstream) = spawn_upstream(StatusCode::OK, json!({ "choices": [] })).await;
    let app = setup_app(&base_url);

    let response = app.oneshot(analyze_idea(WATER_APP)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_unreachable_upstream_is_500() {
    // Port 9 (discard) is not expected to accept HTTP connections
    let app = setup_app("http://127.0.0.1:9/v1");

    let response = app.oneshot(analyze_idea(WATER_APP)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_upstream_timeout_is_500_and_recorded() {
    let base_url = spawn_slow_upstream(Duration::from_secs(3)).await;
    let app = setup_app_with_short_timeout(&base_url);

    let response = app.clone().oneshot(analyze_idea(WATER_APP)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["message"], "Failed to analyze app idea");

    let health = app.oneshot(get_request("/health")).await.unwrap();
    let health = extract_json(health.into_body()).await;
    let last_error = health["last_error"].as_str().unwrap();
    assert!(last_error.contains("timed out after 1s"), "got: {}", last_error);
}

#[tokio::test]
async fn test_top_level_array_reply_is_500_not_compliant() {
    let reply = json!([
        { "guideline": "5.1.1 Data Collection and Storage", "explanation": "Health data", "probability": 0.95 }
    ])
    .to_string();
    let (base_url, _upstream) = spawn_upstream(StatusCode::OK, completion(json!(reply))).await;
    let app = setup_app(&base_url);

    let response = app.oneshot(analyze_idea(WATER_APP)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
