//! Watch-directory intake.
//!
//! Discovers candidate audio files via filesystem notifications when the
//! platform supports them, falling back to directory polling, and emits
//! each file once the stability detector confirms the writer has finished
//! and the tracker has claimed the path. A periodic directory sweep runs
//! even in event mode; notifications are unreliable on network mounts.

use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use thiserror::Error;
use tokio::sync::mpsc;

use super::stability::{FileSignature, StabilityDetector};
use super::tracker::FileTracker;

/// Recognized audio extensions (compared case-insensitively)
pub const AUDIO_EXTENSIONS: &[&str] = &["m4a", "ogg", "wav", "mp3", "opus"];

/// Errors that can occur with the watcher
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Watch directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Directory to watch
    pub watch_dir: PathBuf,

    /// Directory sweep interval
    pub poll_interval: Duration,

    /// Minimum idle time before a file counts as fully written
    pub min_file_age: Duration,

    /// Skip filesystem notifications entirely and rely on sweeps
    pub force_poll: bool,
}

impl From<&crate::config::Config> for WatcherConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            watch_dir: config.watch_dir.clone(),
            poll_interval: config.poll_interval,
            min_file_age: config.min_file_age,
            force_poll: config.force_poll,
        }
    }
}

/// A stable, claimed file ready for processing
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Path to the audio file
    pub path: PathBuf,

    /// Signature at the moment of dispatch
    pub signature: FileSignature,
}

/// Check whether a path carries a recognized audio extension
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Intake watcher with stability checking and dispatch dedup
pub struct IntakeWatcher {
    config: WatcherConfig,
    tracker: Arc<FileTracker>,
}

impl IntakeWatcher {
    pub fn new(config: WatcherConfig, tracker: Arc<FileTracker>) -> Self {
        Self { config, tracker }
    }

    /// Get the current configuration
    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// One pass over the watch directory. Observes every audio file through
    /// the stability detector and returns the candidates that were claimed.
    pub async fn scan_once(
        &self,
        detector: &mut StabilityDetector,
    ) -> Result<Vec<Candidate>, WatcherError> {
        if !self.config.watch_dir.exists() {
            return Err(WatcherError::DirectoryNotFound(self.config.watch_dir.clone()));
        }

        let mut candidates = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.config.watch_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_audio_file(&path) {
                continue;
            }
            if let Some(candidate) = self.check(&path, detector) {
                candidates.push(candidate);
            }
        }

        self.tracker.prune_missing();

        Ok(candidates)
    }

    /// Watch the directory and emit claimed candidates until stopped
    pub async fn watch(self) -> Result<(mpsc::Receiver<Candidate>, WatchHandle), WatcherError> {
        if !self.config.watch_dir.exists() {
            return Err(WatcherError::DirectoryNotFound(self.config.watch_dir.clone()));
        }

        let (event_tx, event_rx) = mpsc::channel::<Candidate>(100);
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            if let Err(e) = run_intake(self, event_tx, &mut stop_rx).await {
                tracing::error!("Intake watcher error: {}", e);
            }
        });

        Ok((event_rx, WatchHandle { stop_tx, task }))
    }

    /// Run one path through stability + claim; `Some` means the caller owns
    /// the dispatch.
    fn check(&self, path: &Path, detector: &mut StabilityDetector) -> Option<Candidate> {
        let signature = detector.observe(path)?;
        if !self.tracker.try_claim(path, signature) {
            return None;
        }
        Some(Candidate {
            path: path.to_path_buf(),
            signature,
        })
    }
}

/// Handle to control the watcher
pub struct WatchHandle {
    stop_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    /// Stop the watcher
    pub async fn stop(self) -> Result<()> {
        let _ = self.stop_tx.send(()).await;
        self.task.await?;
        Ok(())
    }
}

/// Internal watch loop: drain filesystem events, sweep the directory every
/// poll interval, forward claimed candidates.
async fn run_intake(
    watcher: IntakeWatcher,
    event_tx: mpsc::Sender<Candidate>,
    stop_rx: &mut mpsc::Receiver<()>,
) -> Result<(), WatcherError> {
    let config = watcher.config.clone();
    let mut detector = StabilityDetector::new(config.min_file_age);

    // Event-driven when possible; creation failure means polling only
    let (fs_tx, fs_rx) = std::sync::mpsc::channel();
    let mut debouncer = None;
    if !config.force_poll {
        match new_debouncer(Duration::from_secs(2), fs_tx) {
            Ok(mut created) => {
                match created
                    .watcher()
                    .watch(&config.watch_dir, RecursiveMode::NonRecursive)
                {
                    Ok(()) => debouncer = Some(created),
                    Err(e) => {
                        tracing::info!("Filesystem events unavailable ({}), polling instead", e)
                    }
                }
            }
            Err(e) => tracing::info!("Filesystem events unavailable ({}), polling instead", e),
        }
    }

    if debouncer.is_some() {
        tracing::info!(
            "Watching {} (events + {}s sweep)",
            config.watch_dir.display(),
            config.poll_interval.as_secs()
        );
    } else {
        tracing::info!(
            "Polling {} every {}s",
            config.watch_dir.display(),
            config.poll_interval.as_secs()
        );
    }

    // First sweep fires immediately so files present at startup are handled
    let mut last_sweep: Option<Instant> = None;

    loop {
        if stop_rx.try_recv().is_ok() {
            tracing::info!("Intake watcher stopping");
            break;
        }

        if debouncer.is_some() {
            match fs_rx.recv_timeout(Duration::from_millis(500)) {
                Ok(Ok(events)) => {
                    for event in events {
                        let path = event.path;
                        if !is_audio_file(&path) {
                            continue;
                        }
                        if let Some(candidate) = watcher.check(&path, &mut detector) {
                            if event_tx.send(candidate).await.is_err() {
                                return Ok(());
                            }
                        }
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!("Watch error: {:?}", e);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::error!("Watch channel disconnected");
                    break;
                }
            }
        } else {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        let due = last_sweep.map_or(true, |at| at.elapsed() >= config.poll_interval);
        if due {
            last_sweep = Some(Instant::now());
            match watcher.scan_once(&mut detector).await {
                Ok(candidates) => {
                    for candidate in candidates {
                        if event_tx.send(candidate).await.is_err() {
                            return Ok(());
                        }
                    }
                }
                Err(e) => tracing::warn!("Directory sweep failed: {}", e),
            }
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    Ok(())
}
