//! CLI entry point for walkwithme.

pub mod terminal;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// walkwithme companion chat
#[derive(Parser, Debug)]
#[command(name = "walkwithme", version, about = "Companion chat client and LLM relay")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay HTTP service
    Serve(ServeArgs),
    /// Chat in the terminal through a relay
    Chat(ChatArgs),
}

/// Arguments for `walkwithme serve`.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind (overrides config and environment)
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Arguments for `walkwithme chat`.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Relay endpoint URL
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Model override sent to the relay
    #[arg(short, long)]
    pub model: Option<String>,

    /// Snapshot file for the conversation
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Start with an empty conversation instead of restoring the snapshot
    #[arg(long, default_value = "false")]
    pub fresh: bool,
}
