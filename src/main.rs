mod bridge;
mod config;
mod error;
mod irc;
mod template;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::error;

/// Relay one channel on each configured IRC network into a shared
/// conversation.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the bridge configuration (JSON, or TOML when the file ends in `.toml`).
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ircrelay=info".into()),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let validated = config::load_config(&args.config)?;
    bridge::run(validated).await
}
