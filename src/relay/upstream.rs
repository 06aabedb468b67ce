//! Upstream chat-completion call.

use axum::body::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::util::http::{bearer_headers, shared_client};

/// Raw upstream answer, relayed to the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: Bytes,
}

#[derive(Serialize)]
struct UpstreamBody<'a> {
    model: &'a str,
    messages: &'a [serde_json::Value],
}

/// Client for the upstream `/chat/completions` endpoint.
///
/// One attempt per call; the relay never retries.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    url: String,
    client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: shared_client().clone(),
        }
    }

    /// Forward `{model, messages}` with the server-held credential.
    ///
    /// Any HTTP status counts as a reply; only transport failures are errors.
    pub async fn forward(
        &self,
        api_key: &str,
        model: &str,
        messages: &[serde_json::Value],
    ) -> Result<UpstreamReply> {
        debug!(model, messages = messages.len(), "forwarding to upstream");

        let resp = self
            .client
            .post(&self.url)
            .headers(bearer_headers(api_key))
            .json(&UpstreamBody { model, messages })
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        Ok(UpstreamReply { status, body })
    }
}
