//! Wire shapes for the relay request and the upstream completion response.

use bon::Builder;
use serde::{Deserialize, Serialize};

use super::message::Message;

/// Body the client POSTs to the relay.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq)]
pub struct RelayRequest {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// The subset of a chat-completion response the client reads.
///
/// Every level is optional so that a structurally odd but successful
/// response degrades to "no reply" instead of a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub message: Option<CompletionMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// `choices[0].message.content`, trimmed. Blank content yields `None`.
    pub fn reply_text(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }
}

/// Extract the reply text from a raw upstream JSON value.
pub fn extract_reply(value: &serde_json::Value) -> Option<String> {
    serde_json::from_value::<CompletionResponse>(value.clone())
        .ok()
        .and_then(|r| r.reply_text())
}
