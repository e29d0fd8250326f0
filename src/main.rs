//! voice-ingest CLI entrypoint

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use voice_ingest::cli::Cli;
use voice_ingest::config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; RUST_LOG wins over LOG_LEVEL
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::log_filter())),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Parse and execute CLI
    let cli = Cli::parse();
    cli.execute().await
}
