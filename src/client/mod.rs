//! Conversation client: exchange state machine, relay transport, view
//! surface and the session that drives them.

pub mod exchange;
pub mod session;
pub mod transport;
pub mod view;

pub use exchange::{Effect, Exchange, ExchangeEvent, ExchangeState};
pub use session::{ChatSession, SubmitOutcome};
pub use transport::{HttpRelayTransport, RelayTransport};
pub use view::{Bubble, BubbleKind, ChatView, RecordingView, ViewState};
