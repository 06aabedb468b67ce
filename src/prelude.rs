//! Convenience re-exports for common use.

pub use crate::client::{
    Bubble, BubbleKind, ChatSession, ChatView, RecordingView, RelayTransport, SubmitOutcome,
};
pub use crate::config::{ClientConfig, RelayConfig, Settings};
pub use crate::conversation::{
    ConversationBuffer, FileSnapshotStore, Snapshot, SnapshotStore, MAX_HISTORY, SYSTEM_PROMPT,
};
pub use crate::error::{ChatError, FailureKind, Result};
pub use crate::types::{Message, RelayRequest, Role};
