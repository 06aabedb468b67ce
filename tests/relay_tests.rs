//! Tests for the relay router against a mocked upstream.

use axum::body::{to_bytes, Body};
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, ORIGIN, VARY};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use walkwithme::config::RelayConfig;
use walkwithme::relay::{build_router, RelayState};

const ALLOWED: &str = "https://walkwithme.kr";
const BODY_LIMIT: usize = 1_048_576;

fn config(upstream: &str) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.upstream_base_url = format!("{upstream}/v1");
    config.set_api_key("sk-test");
    config
}

fn router(config: RelayConfig) -> Router {
    build_router(RelayState::new(config))
}

fn post(origin: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/")
        .header(CONTENT_TYPE, "application/json");
    if let Some(origin) = origin {
        builder = builder.header(ORIGIN, origin);
    }
    builder.body(body.into()).expect("build request")
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

async fn json_body(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).expect("parse json")
}

fn conversation() -> Value {
    json!({
        "messages": [
            { "role": "system", "content": "be kind" },
            { "role": "user", "content": "hello" }
        ]
    })
}

#[tokio::test]
async fn preflight_from_allowed_origin_is_no_content() {
    let app = router(RelayConfig::default());
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/")
        .header(ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.expect("router call");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert_eq!(
        response.headers()["access-control-allow-methods"],
        "POST, OPTIONS"
    );
    assert_eq!(
        response.headers()["access-control-allow-headers"],
        "Content-Type, Authorization"
    );
    assert_eq!(response.headers()[VARY], "Origin");
}

#[tokio::test]
async fn preflight_from_unknown_origin_is_forbidden_with_cors_headers() {
    let app = router(RelayConfig::default());
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/")
        .header(ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.expect("router call");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED);
    assert_eq!(response.headers()[VARY], "Origin");
}

#[tokio::test]
async fn get_is_a_liveness_probe() {
    let app = router(RelayConfig::default());
    let request = Request::builder()
        .method("GET")
        .uri("/")
        .header(ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.expect("router call");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    assert_eq!(
        json_body(response).await,
        json!({ "ok": true, "service": "walkwithme-api" })
    );
}

#[tokio::test]
async fn disallowed_origin_is_rejected_before_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let app = router(config(&server.uri()));

    let response = app
        .oneshot(post(Some("https://evil.example"), conversation().to_string()))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Forbidden origin");
}

#[tokio::test]
async fn missing_credential_is_server_error() {
    let mut config = RelayConfig::default();
    config.api_key = None;
    let app = router(config);

    let response = app
        .oneshot(post(Some(ALLOWED), conversation().to_string()))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Missing OPENAI_API_KEY" })
    );
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = router(config("http://127.0.0.1:9"));

    let response = app
        .oneshot(post(Some(ALLOWED), "{not json"))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({ "error": "Invalid JSON" }));
}

#[tokio::test]
async fn empty_body_and_empty_messages_are_rejected() {
    for body in ["", "{}", r#"{"messages":[]}"#, r#"{"messages":"hi"}"#, "null"] {
        let app = router(config("http://127.0.0.1:9"));
        let response = app
            .oneshot(post(Some(ALLOWED), body))
            .await
            .expect("router call");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(
            json_body(response).await,
            json!({ "error": "No messages provided" })
        );
    }
}

#[tokio::test]
async fn valid_request_is_forwarded_and_passed_through_verbatim() {
    let server = MockServer::start().await;
    let upstream_body =
        r#"{"id":"chatcmpl-1","choices":[{"index":0,"message":{"role":"assistant","content":"Hi!"}}]}"#;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_json(json!({
            "model": "gpt-5-mini",
            "messages": [
                { "role": "system", "content": "be kind" },
                { "role": "user", "content": "hello" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(upstream_body))
        .expect(1)
        .mount(&server)
        .await;
    let app = router(config(&server.uri()));

    let response = app
        .oneshot(post(Some(ALLOWED), conversation().to_string()))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    assert_eq!(body_text(response).await, upstream_body);
}

#[tokio::test]
async fn non_utf8_upstream_body_is_relayed_byte_for_byte() {
    let server = MockServer::start().await;
    let raw: Vec<u8> = vec![b'{', 0xff, 0xfe, b'}'];
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(raw.clone()))
        .mount(&server)
        .await;
    let app = router(config(&server.uri()));

    let response = app
        .oneshot(post(Some(ALLOWED), conversation().to_string()))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    assert_eq!(bytes.to_vec(), raw);
}

#[tokio::test]
async fn caller_model_is_trimmed_and_extra_message_fields_survive() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_json(json!({
            "model": "gpt-4o",
            "messages": [{ "role": "user", "content": "hi", "name": "sun" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;
    let app = router(config(&server.uri()));

    let body = json!({
        "model": "  gpt-4o ",
        "messages": [{ "role": "user", "content": "hi", "name": "sun" }]
    });
    let response = app
        .oneshot(post(Some(ALLOWED), body.to_string()))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn upstream_errors_pass_through_with_status() {
    let server = MockServer::start().await;
    let error_body = r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string(error_body))
        .mount(&server)
        .await;
    let app = router(config(&server.uri()));

    let response = app
        .oneshot(post(Some(ALLOWED), conversation().to_string()))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED);
    assert_eq!(body_text(response).await, error_body);
}

#[tokio::test]
async fn upstream_is_called_once_even_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;
    let app = router(config(&server.uri()));

    let response = app
        .oneshot(post(Some(ALLOWED), conversation().to_string()))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    // Nothing listens on the discard port.
    let app = router(config("http://127.0.0.1:9"));

    let response = app
        .oneshot(post(Some(ALLOWED), conversation().to_string()))
        .await
        .expect("router call");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn missing_origin_is_treated_as_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let response = router(config(&server.uri()))
        .oneshot(post(None, conversation().to_string()))
        .await
        .expect("router call");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "null");

    let mut strict = config(&server.uri());
    strict.allowed_origins = vec![ALLOWED.to_string()];
    let response = router(strict)
        .oneshot(post(None, conversation().to_string()))
        .await
        .expect("router call");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn any_path_is_handled_the_same() {
    let app = router(RelayConfig::default());
    let request = Request::builder()
        .method("GET")
        .uri("/some/nested/path")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.expect("router call");

    assert_eq!(response.status(), StatusCode::OK);
}
