//! walkwithme: companion chat client and stateless LLM relay.
//!
//! The relay holds the upstream credential, enforces an origin allow-list and
//! forwards conversation payloads to an OpenAI-style chat-completion
//! endpoint. The client keeps a bounded conversation buffer and runs one
//! reply exchange at a time against any [`client::ChatView`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use walkwithme::prelude::*;
//!
//! # async fn example() -> walkwithme::error::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let view = Arc::new(RecordingView::new());
//! let session = ChatSession::from_config(&config, view);
//! session.restore();
//! let outcome = session.submit("Good morning!").await;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod prelude;
pub mod relay;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
