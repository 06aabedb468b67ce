//! View surface the exchange driver renders into.

use std::sync::Mutex;

use crate::error::{ChatError, Result};
use crate::types::Role;

/// Shown while a reply is pending.
pub const THINKING_TEXT: &str = "Thinking…";

/// Shown when the relay answered but carried no reply text.
pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't get an answer just now. Please try again in a moment.";

/// Shown when the request hit the client deadline.
pub const TIMEOUT_NOTICE: &str =
    "It looks like the connection dropped for a moment. Could you try again?";

/// Composer hint restored whenever the composer is unlocked.
pub const COMPOSER_HINT: &str = "Type a message…";

/// Generic failure notice wrapping the error text.
pub fn error_notice(message: &str) -> String {
    format!("Sorry, something went wrong: {message}")
}

/// What a rendered bubble represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleKind {
    /// A real conversation turn.
    Turn,
    /// Fallback or error text; never part of the conversation.
    Notice,
    /// The transient "thinking" indicator.
    Placeholder,
}

/// One chat bubble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub role: Role,
    pub text: String,
    pub kind: BubbleKind,
}

impl Bubble {
    pub fn turn(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            kind: BubbleKind::Turn,
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            kind: BubbleKind::Notice,
        }
    }

    pub fn placeholder() -> Self {
        Self {
            role: Role::Assistant,
            text: THINKING_TEXT.to_string(),
            kind: BubbleKind::Placeholder,
        }
    }

    /// Speaker label shown next to the text.
    pub fn label(&self) -> &'static str {
        match self.role {
            Role::User => "me",
            _ => "friend",
        }
    }
}

/// Rendering surface for a chat front-end.
///
/// Methods take `&self`; implementations hold their own interior state so a
/// session can be shared across tasks.
pub trait ChatView: Send + Sync {
    fn render(&self, bubble: &Bubble);
    fn show_placeholder(&self, bubble: &Bubble);
    /// May fail if the placeholder is already gone; the driver carries on.
    fn remove_placeholder(&self) -> Result<()>;
    fn clear_composer(&self);
    fn focus_composer(&self);
    /// Disable composer and submit control.
    fn lock_composer(&self);
    /// Re-enable composer and submit control and restore the hint text.
    fn unlock_composer(&self, hint: &str);
}

/// Observable UI state, recorded for tests and headless front-ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub bubbles: Vec<Bubble>,
    pub placeholder: Option<Bubble>,
    pub composer_locked: bool,
    pub composer_hint: Option<String>,
    pub focus_count: usize,
    pub unlock_count: usize,
}

/// Headless view that records everything rendered into it.
#[derive(Debug, Default)]
pub struct RecordingView {
    state: Mutex<ViewState>,
    fail_placeholder_removal: bool,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// A view whose placeholder removal always errors.
    pub fn failing_placeholder_removal() -> Self {
        Self {
            state: Mutex::default(),
            fail_placeholder_removal: true,
        }
    }

    pub fn state(&self) -> ViewState {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ViewState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ChatView for RecordingView {
    fn render(&self, bubble: &Bubble) {
        self.lock().bubbles.push(bubble.clone());
    }

    fn show_placeholder(&self, bubble: &Bubble) {
        self.lock().placeholder = Some(bubble.clone());
    }

    fn remove_placeholder(&self) -> Result<()> {
        let mut state = self.lock();
        if self.fail_placeholder_removal {
            return Err(ChatError::View("placeholder node detached".into()));
        }
        match state.placeholder.take() {
            Some(_) => Ok(()),
            None => Err(ChatError::View("no placeholder to remove".into())),
        }
    }

    fn clear_composer(&self) {}

    fn focus_composer(&self) {
        self.lock().focus_count += 1;
    }

    fn lock_composer(&self) {
        self.lock().composer_locked = true;
    }

    fn unlock_composer(&self, hint: &str) {
        let mut state = self.lock();
        state.composer_locked = false;
        state.composer_hint = Some(hint.to_string());
        state.unlock_count += 1;
    }
}
