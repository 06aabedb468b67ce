//! Shared test helpers and stub transports.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use walkwithme::client::{ChatSession, RecordingView, RelayTransport};
use walkwithme::conversation::{ConversationBuffer, MemorySnapshotStore};
use walkwithme::error::{ChatError, Result};
use walkwithme::types::RelayRequest;

/// Returns queued results in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<Vec<Result<Option<String>>>>,
    requests: Mutex<Vec<RelayRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_reply(&self, text: &str) {
        self.replies.lock().unwrap().push(Ok(Some(text.to_string())));
    }

    pub fn queue_empty(&self) {
        self.replies.lock().unwrap().push(Ok(None));
    }

    pub fn queue_error(&self, error: ChatError) {
        self.replies.lock().unwrap().push(Err(error));
    }

    pub fn requests(&self) -> Vec<RelayRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayTransport for ScriptedTransport {
    async fn send(&self, request: &RelayRequest) -> Result<Option<String>> {
        self.requests.lock().unwrap().push(request.clone());
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Ok(Some("Mock reply".to_string()));
        }
        replies.remove(0)
    }
}

/// Never resolves.
#[derive(Default)]
pub struct PendingTransport {
    calls: AtomicUsize,
}

impl PendingTransport {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelayTransport for PendingTransport {
    async fn send(&self, _request: &RelayRequest) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Signals when a request starts and holds it until released.
#[derive(Default)]
pub struct GateTransport {
    pub started: Notify,
    pub release: Notify,
    calls: AtomicUsize,
}

impl GateTransport {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelayTransport for GateTransport {
    async fn send(&self, _request: &RelayRequest) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(Some("finally here".to_string()))
    }
}

/// Panics on every send.
#[derive(Default)]
pub struct PanickingTransport;

#[async_trait]
impl RelayTransport for PanickingTransport {
    async fn send(&self, _request: &RelayRequest) -> Result<Option<String>> {
        panic!("transport exploded");
    }
}

/// Session wired to in-memory collaborators.
pub struct Harness {
    pub session: Arc<ChatSession>,
    pub view: Arc<RecordingView>,
    pub store: Arc<MemorySnapshotStore>,
}

pub fn harness(transport: Arc<dyn RelayTransport>) -> Harness {
    harness_with(transport, Arc::new(RecordingView::new()), MemorySnapshotStore::new())
}

pub fn harness_with(
    transport: Arc<dyn RelayTransport>,
    view: Arc<RecordingView>,
    store: MemorySnapshotStore,
) -> Harness {
    let store = Arc::new(store);
    let session = ChatSession::new(
        ConversationBuffer::new(),
        transport,
        store.clone(),
        view.clone(),
    );
    Harness {
        session: Arc::new(session),
        view,
        store,
    }
}
