//! Single-flight reply exchange state machine.
//!
//! `Exchange::handle` maps `(state, event)` to `(state, effects)` without
//! doing any I/O. The conversation buffer is part of the machine's state and
//! is only mutated here.

use tracing::debug;

use crate::conversation::{ConversationBuffer, Snapshot};
use crate::error::FailureKind;
use crate::types::{Message, Role};

use super::view::{error_notice, Bubble, FALLBACK_REPLY, TIMEOUT_NOTICE};

/// Where the exchange currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Sending,
    Succeeded,
    Failed,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeEvent {
    /// Form submission with the raw composer text.
    Submit(String),
    /// The relay answered 2xx; `None` when no reply text could be extracted.
    Replied(Option<String>),
    /// The request failed or timed out.
    Failed { kind: FailureKind, message: String },
    /// Cleanup after either outcome.
    Settled,
}

/// Side effects for the driver to carry out, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FocusComposer,
    Render(Bubble),
    ClearComposer,
    LockComposer,
    ShowPlaceholder(Bubble),
    RemovePlaceholder,
    Persist(Snapshot),
    SendRequest(Vec<Message>),
    UnlockComposer,
}

/// The exchange state plus the conversation it guards.
#[derive(Debug, Clone)]
pub struct Exchange {
    state: ExchangeState,
    buffer: ConversationBuffer,
}

impl Exchange {
    pub fn new(buffer: ConversationBuffer) -> Self {
        Self {
            state: ExchangeState::Idle,
            buffer,
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ExchangeState::Idle
    }

    pub fn buffer(&self) -> &ConversationBuffer {
        &self.buffer
    }

    /// Mutable access to the buffer, only granted while idle.
    pub fn buffer_mut(&mut self) -> Option<&mut ConversationBuffer> {
        if self.is_idle() {
            Some(&mut self.buffer)
        } else {
            None
        }
    }

    /// Apply one event and return the effects it produces.
    pub fn handle(&mut self, event: ExchangeEvent) -> Vec<Effect> {
        match (self.state, event) {
            (ExchangeState::Idle, ExchangeEvent::Submit(input)) => self.submit(&input),
            (ExchangeState::Sending, ExchangeEvent::Replied(reply)) => {
                self.state = ExchangeState::Succeeded;
                let mut effects = vec![Effect::RemovePlaceholder];
                match reply.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                    Some(text) => {
                        if let Ok(message) = self.buffer.append(Role::Assistant, text) {
                            effects.push(Effect::Render(Bubble::turn(
                                Role::Assistant,
                                message.content.clone(),
                            )));
                        }
                        effects.push(Effect::Persist(self.buffer.snapshot()));
                    }
                    None => effects.push(Effect::Render(Bubble::notice(FALLBACK_REPLY))),
                }
                effects
            }
            (ExchangeState::Sending, ExchangeEvent::Failed { kind, message }) => {
                self.state = ExchangeState::Failed;
                let text = match kind {
                    FailureKind::Timeout => TIMEOUT_NOTICE.to_string(),
                    FailureKind::Other => error_notice(&message),
                };
                vec![Effect::RemovePlaceholder, Effect::Render(Bubble::notice(text))]
            }
            // Abandoned mid-flight: the placeholder is still up.
            (ExchangeState::Sending, ExchangeEvent::Settled) => {
                self.state = ExchangeState::Idle;
                vec![Effect::RemovePlaceholder, Effect::UnlockComposer]
            }
            (ExchangeState::Succeeded | ExchangeState::Failed, ExchangeEvent::Settled) => {
                self.state = ExchangeState::Idle;
                vec![Effect::UnlockComposer]
            }
            (state, event) => {
                debug!(?state, ?event, "exchange event ignored");
                Vec::new()
            }
        }
    }

    fn submit(&mut self, input: &str) -> Vec<Effect> {
        let content = input.trim();
        if content.is_empty() {
            return vec![Effect::FocusComposer];
        }
        let rendered = match self.buffer.append(Role::User, content) {
            Ok(message) => Bubble::turn(Role::User, message.content.clone()),
            Err(_) => return vec![Effect::FocusComposer],
        };
        self.state = ExchangeState::Sending;
        vec![
            Effect::Render(rendered),
            Effect::Persist(self.buffer.snapshot()),
            Effect::LockComposer,
            Effect::ClearComposer,
            Effect::ShowPlaceholder(Bubble::placeholder()),
            Effect::SendRequest(self.buffer.build_request_payload()),
        ]
    }
}
