//! Chat session driver: runs exchange effects against a view, a transport
//! and a snapshot store.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::conversation::{ConversationBuffer, FileSnapshotStore, SnapshotStore};
use crate::error::{ChatError, FailureKind, Result};
use crate::types::{Message, RelayRequest};
use crate::util::timeout::with_timeout;

use super::exchange::{Effect, Exchange, ExchangeEvent, ExchangeState};
use super::transport::{HttpRelayTransport, RelayTransport};
use super::view::{Bubble, ChatView, COMPOSER_HINT};

/// Result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing was sent.
    Empty,
    /// Another exchange is in flight; nothing was sent.
    Busy,
    /// The reply was appended to the conversation.
    Replied(String),
    /// The relay answered without reply text; the fallback was shown.
    NoReply,
    /// The exchange failed; the notice was shown.
    Failed { kind: FailureKind, message: String },
}

/// One conversation with a single-flight exchange.
///
/// All methods take `&self` so the session can be shared behind an `Arc`;
/// the exchange lock is never held across an await.
pub struct ChatSession {
    exchange: Mutex<Exchange>,
    transport: Arc<dyn RelayTransport>,
    store: Arc<dyn SnapshotStore>,
    view: Arc<dyn ChatView>,
    timeout: Duration,
    model: Option<String>,
}

impl ChatSession {
    pub fn new(
        buffer: ConversationBuffer,
        transport: Arc<dyn RelayTransport>,
        store: Arc<dyn SnapshotStore>,
        view: Arc<dyn ChatView>,
    ) -> Self {
        Self {
            exchange: Mutex::new(Exchange::new(buffer)),
            transport,
            store,
            view,
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            model: None,
        }
    }

    /// HTTP transport and file store as described by `config`.
    pub fn from_config(config: &ClientConfig, view: Arc<dyn ChatView>) -> Self {
        let buffer = ConversationBuffer::new().with_max_history(config.max_history);
        let transport = Arc::new(HttpRelayTransport::new(config.endpoint.clone()));
        let store = Arc::new(FileSnapshotStore::new(config.resolved_snapshot_path()));
        Self::new(buffer, transport, store, view)
            .with_timeout(config.timeout())
            .with_model(config.model.clone())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Model override forwarded to the relay; `None` lets the relay decide.
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model.filter(|m| !m.trim().is_empty());
        self
    }

    /// Rehydrate from the store and render the restored history.
    ///
    /// A missing or unreadable snapshot leaves the conversation empty.
    pub fn restore(&self) -> usize {
        let restored = match self.store.load_or_empty() {
            Some(snapshot) => {
                let mut exchange = self.lock();
                match exchange.buffer_mut() {
                    Some(buffer) => {
                        buffer.replace_with(snapshot);
                        buffer.messages().to_vec()
                    }
                    None => Vec::new(),
                }
            }
            None => Vec::new(),
        };
        for message in &restored {
            self.view.render(&Bubble::turn(message.role, message.content.clone()));
        }
        info!(messages = restored.len(), "conversation restored");
        restored.len()
    }

    /// Run one full exchange for `input`.
    pub async fn submit(&self, input: &str) -> SubmitOutcome {
        let (was_idle, effects) = {
            let mut exchange = self.lock();
            let was_idle = exchange.is_idle();
            (was_idle, exchange.handle(ExchangeEvent::Submit(input.to_string())))
        };
        if !was_idle {
            debug!("submission rejected while a reply is pending");
            return SubmitOutcome::Busy;
        }

        // Settles on every exit, including cancellation and panics. A blank
        // submission leaves the exchange idle, so settling it is a no-op.
        let _settle = SettleGuard { session: self };
        let Some(messages) = self.apply(effects) else {
            return SubmitOutcome::Empty;
        };

        let request = RelayRequest {
            messages,
            model: self.model.clone(),
        };
        let result = with_timeout(self.timeout, self.transport.send(&request)).await;

        let (event, outcome) = match result {
            Ok(Some(reply)) if !reply.trim().is_empty() => {
                let text = reply.trim().to_string();
                (
                    ExchangeEvent::Replied(Some(text.clone())),
                    SubmitOutcome::Replied(text),
                )
            }
            Ok(_) => (ExchangeEvent::Replied(None), SubmitOutcome::NoReply),
            Err(err) => {
                warn!(error = %err, "reply exchange failed");
                let kind = err.failure_kind();
                let message = err.user_message();
                (
                    ExchangeEvent::Failed {
                        kind,
                        message: message.clone(),
                    },
                    SubmitOutcome::Failed { kind, message },
                )
            }
        };

        let effects = self.lock().handle(event);
        self.apply(effects);
        outcome
    }

    /// Clear the conversation and its snapshot. Refused mid-exchange.
    pub fn reset(&self) -> Result<()> {
        {
            let mut exchange = self.lock();
            let buffer = exchange.buffer_mut().ok_or_else(|| {
                ChatError::InvalidState("cannot reset while a reply is pending".into())
            })?;
            buffer.clear();
        }
        self.store.clear()
    }

    pub fn state(&self) -> ExchangeState {
        self.lock().state()
    }

    /// Copy of the stored conversation (system message excluded).
    pub fn messages(&self) -> Vec<Message> {
        self.lock().buffer().messages().to_vec()
    }

    /// The payload the next request would carry, were it sent now.
    pub fn request_payload(&self) -> Vec<Message> {
        self.lock().buffer().build_request_payload()
    }

    fn settle(&self) {
        let effects = self.lock().handle(ExchangeEvent::Settled);
        self.apply(effects);
    }

    /// Execute effects in order, returning the request payload if one was
    /// issued. View and store failures are logged and never stop the
    /// remaining effects.
    fn apply(&self, effects: Vec<Effect>) -> Option<Vec<Message>> {
        let mut request = None;
        for effect in effects {
            match effect {
                Effect::FocusComposer => self.view.focus_composer(),
                Effect::Render(bubble) => self.view.render(&bubble),
                Effect::ClearComposer => self.view.clear_composer(),
                Effect::LockComposer => self.view.lock_composer(),
                Effect::ShowPlaceholder(bubble) => self.view.show_placeholder(&bubble),
                Effect::RemovePlaceholder => {
                    if let Err(err) = self.view.remove_placeholder() {
                        warn!(error = %err, "failed to remove thinking placeholder");
                    }
                }
                Effect::Persist(snapshot) => {
                    if let Err(err) = self.store.save(&snapshot) {
                        warn!(error = %err, "failed to persist conversation snapshot");
                    }
                }
                Effect::SendRequest(messages) => request = Some(messages),
                Effect::UnlockComposer => self.view.unlock_composer(COMPOSER_HINT),
            }
        }
        request
    }

    fn lock(&self) -> MutexGuard<'_, Exchange> {
        self.exchange
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Runs the exchange's cleanup when dropped.
struct SettleGuard<'a> {
    session: &'a ChatSession,
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            warn!("reply exchange panicked; settling");
        }
        self.session.settle();
    }
}
