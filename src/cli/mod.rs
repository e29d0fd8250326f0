//! Command-line interface for voice-ingest.
//!
//! - `voice-ingest run` (or no subcommand): watch and process until stopped
//! - `voice-ingest scan`: one pass over the directory, then exit
//! - `voice-ingest config`: print the resolved configuration

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::ingest::AUDIO_EXTENSIONS;
use crate::pipeline;

/// voice-ingest - watch, transcribe, webhook
#[derive(Parser, Debug)]
#[command(name = "voice-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the intake directory and process files until shut down
    Run,

    /// Process whatever is currently stable in the intake directory, then exit
    Scan,

    /// Show the resolved configuration
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command.unwrap_or(Commands::Run) {
            Commands::Run => {
                let config = Config::from_env()?;
                pipeline::run(config).await
            }
            Commands::Scan => {
                let config = Config::from_env()?;
                pipeline::scan_once(config).await
            }
            Commands::Config => show_config(),
        }
    }
}

/// Print the resolved configuration, token masked
fn show_config() -> Result<()> {
    let config = Config::from_env()?;

    println!();
    println!("Voice Ingest Configuration");
    println!("══════════════════════════════════════════════════════════════");
    println!();
    println!("Watch dir:        {}", config.watch_dir.display());
    println!("Extensions:       {}", AUDIO_EXTENSIONS.join(", "));
    println!("Poll interval:    {}s", config.poll_interval.as_secs());
    println!("Min file age:     {}s", config.min_file_age.as_secs());
    println!("Force poll:       {}", config.force_poll);
    println!();
    println!("STT endpoint:     {}", config.stt_url);
    println!("STT model:        {}", config.stt_model);
    println!("Hook endpoint:    {}", config.hook_endpoint());
    println!("Hook token:       (set, hidden)");
    println!();
    println!("Delete after:     {}", config.delete_after_transcribe);
    println!("Max concurrent:   {}", config.max_concurrent);
    println!("Failed retry:     {}s", config.failed_retry.as_secs());
    println!("Shutdown grace:   {}s", config.shutdown_grace.as_secs());
    println!();

    if config.watch_dir.exists() {
        println!("✓ Watch dir exists");
    } else {
        println!("⚠ Watch dir does not exist yet (created at startup)");
    }

    Ok(())
}
