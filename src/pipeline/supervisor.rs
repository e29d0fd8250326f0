//! Long-running supervision of the intake → process pipeline.
//!
//! Owns the watch loop, dispatches one processor task per claimed
//! candidate through a bounded worker pool, and handles graceful shutdown:
//! on SIGINT/SIGTERM the intake stops and in-flight work gets a bounded
//! grace period to finish.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::adapters::{HookClient, SttClient, Transcriber, TranscriptSink};
use crate::config::Config;
use crate::ingest::{Candidate, FileTracker, IntakeWatcher, StabilityDetector, WatcherConfig};
use crate::pipeline::processor::FileProcessor;

/// Run the pipeline until a shutdown signal arrives
pub async fn run(config: Config) -> Result<()> {
    let (processor, tracker, watcher) = bootstrap(&config).await?;

    let (mut candidates, watch_handle) = watcher.watch().await?;

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
    let mut workers: JoinSet<()> = JoinSet::new();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(candidate) = candidates.recv() => {
                dispatch(&mut workers, candidate, processor.clone(), tracker.clone(), semaphore.clone());
            }
            Some(joined) = workers.join_next(), if !workers.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!("Worker task failed: {}", e);
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    // Stop discovering, then drain in-flight work up to the grace period
    watch_handle.stop().await?;

    if !workers.is_empty() {
        tracing::info!(
            "Waiting up to {}s for {} in-flight file(s)",
            config.shutdown_grace.as_secs(),
            workers.len()
        );
        let drain = async {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    tracing::error!("Worker task failed: {}", e);
                }
            }
        };
        if tokio::time::timeout(config.shutdown_grace, drain).await.is_err() {
            tracing::warn!("Grace period elapsed; abandoning remaining work");
            workers.shutdown().await;
        }
    }

    tracing::info!("Voice ingest stopped");
    Ok(())
}

/// One pass over the watch directory, processing whatever is stable now.
/// Files still settling are skipped, not waited for.
pub async fn scan_once(config: Config) -> Result<()> {
    let (processor, tracker, watcher) = bootstrap(&config).await?;

    let mut detector = StabilityDetector::new(config.min_file_age);
    let candidates = watcher.scan_once(&mut detector).await?;

    if candidates.is_empty() {
        tracing::info!("No stable files to process");
        return Ok(());
    }

    tracing::info!("Processing {} file(s)", candidates.len());
    let mut delivered = 0usize;
    for candidate in candidates {
        let outcome = processor.process(&candidate.path).await;
        if outcome.is_delivered() {
            delivered += 1;
        }
        tracker.release(&candidate.path, candidate.signature, outcome.into());
    }

    tracing::info!("Delivered {} transcript(s)", delivered);
    Ok(())
}

type RealProcessor = FileProcessor<SttClient, HookClient>;

/// Validate the environment, log the startup banner, and wire up the
/// clients, tracker and watcher.
async fn bootstrap(config: &Config) -> Result<(Arc<RealProcessor>, Arc<FileTracker>, IntakeWatcher)> {
    tokio::fs::create_dir_all(&config.watch_dir)
        .await
        .with_context(|| format!("Failed to create watch dir {}", config.watch_dir.display()))?;

    let stt = SttClient::new(config.stt_url.clone(), config.stt_model.clone());
    let hook = HookClient::new(
        &config.openclaw_url,
        &config.hook_path,
        config.hook_token.clone(),
    );

    tracing::info!("Voice ingest starting");
    tracing::info!("  Watch dir: {}", config.watch_dir.display());
    tracing::info!("  STT: {} (model: {})", config.stt_url, config.stt_model);
    tracing::info!("  Hook: {}", hook.endpoint());
    tracing::info!("  Delete after transcribe: {}", config.delete_after_transcribe);

    let processor = Arc::new(FileProcessor::new(stt, hook, config.delete_after_transcribe));
    let tracker = Arc::new(FileTracker::new(config.failed_retry));
    let watcher = IntakeWatcher::new(WatcherConfig::from(config), tracker.clone());

    Ok((processor, tracker, watcher))
}

/// Spawn one worker for a claimed candidate. The permit is acquired inside
/// the task so dispatch never blocks candidate intake.
fn dispatch<T, S>(
    workers: &mut JoinSet<()>,
    candidate: Candidate,
    processor: Arc<FileProcessor<T, S>>,
    tracker: Arc<FileTracker>,
    semaphore: Arc<Semaphore>,
) where
    T: Transcriber + 'static,
    S: TranscriptSink + 'static,
{
    workers.spawn(async move {
        let _permit = match semaphore.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return, // semaphore closed, shutting down
        };

        let outcome = processor.process(&candidate.path).await;
        tracker.release(&candidate.path, candidate.signature, outcome.into());
    });
}

/// Resolves when SIGINT or SIGTERM arrives
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
