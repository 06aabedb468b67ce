//! walkwithme binary entry point.

use std::sync::Arc;

use clap::Parser;
use walkwithme::cli::terminal::{self, TerminalView};
use walkwithme::cli::{ChatArgs, Cli, Commands, ServeArgs};
use walkwithme::client::ChatSession;
use walkwithme::config::Settings;
use walkwithme::error::Result;

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => handle_serve(args).await,
        Commands::Chat(args) => handle_chat(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    if tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish(),
    )
    .is_err()
    {
        // Subscriber already installed.
    }
}

async fn handle_serve(args: ServeArgs) -> Result<()> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        settings.relay.bind_addr = bind;
    }
    if settings.relay.api_key().is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; POST requests will be rejected with 500");
    }
    walkwithme::relay::serve(settings.relay).await
}

async fn handle_chat(args: ChatArgs) -> Result<()> {
    let mut settings = Settings::load(args.config.as_deref())?;
    let client = &mut settings.client;
    if let Some(endpoint) = args.endpoint {
        client.endpoint = endpoint;
    }
    if let Some(model) = args.model {
        client.model = Some(model);
    }
    if let Some(path) = args.snapshot {
        client.snapshot_path = Some(path);
    }

    let view = Arc::new(TerminalView::new());
    let session = ChatSession::from_config(client, view);
    if args.fresh {
        session.reset()?;
    } else {
        session.restore();
    }

    terminal::run(&session).await
}
