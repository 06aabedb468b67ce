//! Line-oriented terminal front-end.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::client::{Bubble, BubbleKind, ChatSession, ChatView};
use crate::error::{ChatError, Result};

/// Prints bubbles to stdout; the composer is the terminal prompt.
#[derive(Debug, Default)]
pub struct TerminalView {
    placeholder_shown: AtomicBool,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }

    fn print(line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

impl ChatView for TerminalView {
    fn render(&self, bubble: &Bubble) {
        let marker = match bubble.kind {
            BubbleKind::Notice => "!",
            _ => ">",
        };
        Self::print(&format!("{} {marker} {}", bubble.label(), bubble.text));
    }

    fn show_placeholder(&self, bubble: &Bubble) {
        self.placeholder_shown.store(true, Ordering::SeqCst);
        Self::print(&format!("{} … {}", bubble.label(), bubble.text));
    }

    fn remove_placeholder(&self) -> Result<()> {
        if self.placeholder_shown.swap(false, Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ChatError::View("no placeholder shown".into()))
        }
    }

    fn clear_composer(&self) {}

    fn focus_composer(&self) {
        Self::print("(type something first)");
    }

    // The prompt is not read again until the exchange settles.
    fn lock_composer(&self) {}

    fn unlock_composer(&self, hint: &str) {
        Self::print(&format!("[{hint}]"));
    }
}

/// Read lines from stdin and submit them until EOF or `/quit`.
///
/// `/reset` clears the conversation and its snapshot.
pub async fn run(session: &ChatSession) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    TerminalView::print("Commands: /reset clears the conversation, /quit exits.");

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/reset" => {
                session.reset()?;
                TerminalView::print("(conversation cleared)");
            }
            _ => {
                session.submit(&line).await;
            }
        }
    }
    Ok(())
}
