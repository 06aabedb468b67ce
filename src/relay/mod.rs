//! Stateless relay between browser clients and the upstream LLM API.
//!
//! Every request is handled independently: method dispatch, origin check,
//! credential check, body validation, then a single upstream call whose
//! status and body are passed back verbatim. Rejections are ordinary JSON
//! responses; nothing in the pipeline returns an error to axum.

pub mod cors;
pub mod upstream;

pub use cors::{request_origin, OriginPolicy};
pub use upstream::{UpstreamClient, UpstreamReply};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::error::{ChatError, ErrorBody, Result};

/// Shared, immutable relay state.
#[derive(Clone)]
pub struct RelayState {
    config: Arc<RelayConfig>,
    policy: OriginPolicy,
    upstream: UpstreamClient,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Self {
        let policy = OriginPolicy::new(config.allowed_origins.clone());
        let upstream = UpstreamClient::new(config.completions_url());
        Self {
            config: Arc::new(config),
            policy,
            upstream,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse<'a> {
    ok: bool,
    service: &'a str,
}

/// Router answering on every path; the relay ignores the request path.
pub fn build_router(state: RelayState) -> Router {
    Router::new()
        .route("/", any(relay_handler))
        .route("/*path", any(relay_handler))
        .with_state(state)
}

/// Bind `config.bind_addr` and serve until Ctrl-C.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let addr: SocketAddr = config.bind_addr.parse().map_err(|_| {
        ChatError::Configuration(format!("invalid bind address '{}'", config.bind_addr))
    })?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, service = %config.service_name, "relay listening");

    axum::serve(listener, build_router(RelayState::new(config)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Serve on an already bound listener until the process exits.
pub async fn serve_listener(listener: TcpListener, config: RelayConfig) -> Result<()> {
    axum::serve(listener, build_router(RelayState::new(config))).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("relay shutting down");
}

async fn relay_handler(
    State(state): State<RelayState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let span = info_span!("relay", request_id = %Uuid::new_v4(), %method);
    handle(state, method, headers, body).instrument(span).await
}

async fn handle(state: RelayState, method: Method, headers: HeaderMap, body: Bytes) -> Response {
    let origin = request_origin(&headers);
    let cors = state.policy.headers(&origin);
    let allowed = state.policy.is_allowed(&origin);

    if method == Method::OPTIONS {
        let status = if allowed {
            StatusCode::NO_CONTENT
        } else {
            warn!(%origin, "preflight from disallowed origin");
            StatusCode::FORBIDDEN
        };
        return (status, cors, Body::empty()).into_response();
    }

    if method == Method::GET {
        let health = HealthResponse {
            ok: true,
            service: &state.config.service_name,
        };
        return (StatusCode::OK, json_headers(cors), Json(health)).into_response();
    }

    if !allowed {
        warn!(%origin, "request from disallowed origin");
        return error_response(StatusCode::FORBIDDEN, cors, "Forbidden origin");
    }

    let Some(api_key) = state.config.api_key() else {
        warn!("upstream credential is not configured");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            cors,
            "Missing OPENAI_API_KEY",
        );
    };

    let Some(payload) = parse_body(&body) else {
        return error_response(StatusCode::BAD_REQUEST, cors, "Invalid JSON");
    };

    let messages = match payload.get("messages").and_then(Value::as_array) {
        Some(messages) if !messages.is_empty() => messages,
        _ => return error_response(StatusCode::BAD_REQUEST, cors, "No messages provided"),
    };

    let model = select_model(&payload, &state.config.default_model);

    match state.upstream.forward(api_key, &model, messages).await {
        Ok(reply) => {
            info!(status = reply.status, %model, "upstream replied");
            let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, json_headers(cors), Body::from(reply.body)).into_response()
        }
        Err(err) => {
            warn!(error = %err, "upstream unreachable");
            error_response(StatusCode::BAD_GATEWAY, cors, &err.to_string())
        }
    }
}

/// Raw body as JSON; an empty body reads as `{}`.
fn parse_body(body: &[u8]) -> Option<Value> {
    if body.is_empty() {
        return Some(Value::Object(Default::default()));
    }
    let text = std::str::from_utf8(body).ok()?;
    serde_json::from_str(text).ok()
}

/// Caller's trimmed `model` when it is a non-blank string, else the default.
fn select_model(payload: &Value, default_model: &str) -> String {
    payload
        .get("model")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(default_model)
        .to_string()
}

fn json_headers(mut headers: HeaderMap) -> HeaderMap {
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn error_response(status: StatusCode, cors: HeaderMap, message: &str) -> Response {
    (status, json_headers(cors), Json(ErrorBody::new(message))).into_response()
}
