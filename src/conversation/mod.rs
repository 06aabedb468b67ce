//! Conversation buffer and request payload builder.
//!
//! The buffer stores only user and assistant turns. The persona instruction
//! lives outside it and is prepended whenever a payload is built, so it can
//! neither be truncated away nor duplicated in persisted history.

pub mod snapshot;

pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, Snapshot, SnapshotStore};

use crate::error::{ChatError, Result};
use crate::types::{Message, Role};

/// Number of user/assistant pairs kept in requests and snapshots.
pub const MAX_HISTORY: usize = 12;

/// Fixed persona instruction sent as the first message of every request.
pub const SYSTEM_PROMPT: &str = concat!(
    "You are a warm, attentive companion for older adults who also happens to know a great deal about every field. ",
    "Speak casually and kindly, like a longtime friend in their sixties or seventies, and remember what you have been told ",
    "about the person's name, age, family and health so you can bring it up again. ",
    "Answer calmly in three or four sentences and close with a gentle follow-up question."
);

/// Ordered user/assistant history for one conversation.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    system: Message,
    messages: Vec<Message>,
    max_history: usize,
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationBuffer {
    /// Empty buffer with the default persona and window.
    pub fn new() -> Self {
        Self::with_system_prompt(SYSTEM_PROMPT)
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            system: Message::system(prompt),
            messages: Vec::new(),
            max_history: MAX_HISTORY,
        }
    }

    /// Change the window size (in pairs).
    pub fn with_max_history(mut self, pairs: usize) -> Self {
        self.max_history = pairs;
        self
    }

    /// Rebuild a buffer from a snapshot with a window of `max_history` pairs.
    pub fn from_snapshot(snapshot: Snapshot, max_history: usize) -> Self {
        let mut buffer = Self::new().with_max_history(max_history);
        buffer.replace_with(snapshot);
        buffer
    }

    /// Replace the whole history with the snapshot's messages.
    ///
    /// System entries in the snapshot are dropped.
    pub fn replace_with(&mut self, snapshot: Snapshot) {
        self.messages = snapshot
            .messages
            .into_iter()
            .filter(|m| !m.is_system())
            .collect();
    }

    /// Add a message at the end of the buffer.
    ///
    /// User content must be non-blank and is stored trimmed. Assistant
    /// content is stored as given.
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> Result<&Message> {
        let content = content.into();
        let message = match role {
            Role::System => {
                return Err(ChatError::InvalidArgument(
                    "the system message is fixed and cannot be appended".into(),
                ))
            }
            Role::User => {
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    return Err(ChatError::InvalidArgument(
                        "user message must not be empty".into(),
                    ));
                }
                Message::user(trimmed)
            }
            Role::Assistant => Message::assistant(content),
        };
        self.messages.push(message);
        Ok(&self.messages[self.messages.len() - 1])
    }

    /// `[system] + newest 2 * max_history non-system messages`, in order.
    pub fn build_request_payload(&self) -> Vec<Message> {
        let window = self.window();
        let mut payload = Vec::with_capacity(window.len() + 1);
        payload.push(self.system.clone());
        payload.extend(window.iter().cloned());
        payload
    }

    /// The persisted form of the buffer, windowed like the payload.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.window().to_vec())
    }

    /// Newest `2 * max_history` messages.
    pub fn window(&self) -> &[Message] {
        let start = self.messages.len().saturating_sub(self.max_history * 2);
        &self.messages[start..]
    }

    pub fn system_message(&self) -> &Message {
        &self.system
    }

    /// Every stored message, including those outside the window.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
