//! Client-side transport to the relay.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ChatError, Result};
use crate::types::{extract_reply, RelayRequest};
use crate::util::http::{json_headers, shared_client};

/// Sends one request payload to the relay and returns the reply text.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// `Ok(None)` means the relay answered 2xx without usable reply text.
    async fn send(&self, request: &RelayRequest) -> Result<Option<String>>;
}

/// HTTP transport posting JSON to the relay endpoint.
#[derive(Debug, Clone)]
pub struct HttpRelayTransport {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRelayTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: shared_client().clone(),
        }
    }
}

#[async_trait]
impl RelayTransport for HttpRelayTransport {
    async fn send(&self, request: &RelayRequest) -> Result<Option<String>> {
        debug!(
            endpoint = %self.endpoint,
            messages = request.messages.len(),
            "posting conversation to relay"
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .headers(json_headers())
            .json(request)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        if !(200..300).contains(&status) {
            return Err(status_to_error(status, &body));
        }

        let value: serde_json::Value = serde_json::from_str(&body)?;
        Ok(extract_reply(&value))
    }
}

/// Turn a non-2xx relay response into an API error.
///
/// Relay rejections carry `{"error": "..."}`; upstream errors passed through
/// verbatim carry `{"error": {"message": "..."}}`. Anything else falls back to
/// the status code.
pub fn status_to_error(status: u16, body: &str) -> ChatError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            match error {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Object(obj) => obj
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string),
                _ => None,
            }
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("response status {status}"));
    ChatError::api(status, message)
}
