//! Per-file processing pipeline.
//!
//! Runs one stable file through transcribe → deliver → cleanup. A failure
//! at either network stage leaves the file on disk; deletion happens only
//! after the webhook has acknowledged the transcript, and only when
//! enabled. All errors are logged here and surface only as the outcome.

use std::path::Path;

use chrono::{DateTime, Local};

use crate::adapters::{HookPayload, Transcriber, TranscriptSink};
use crate::ingest::AttemptOutcome;

/// Terminal result of one file's pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// Transcript delivered, source file removed
    DeliveredAndDeleted,

    /// Transcript delivered, source file kept (deletion disabled or failed)
    DeliveredKept,

    /// Transcription failed; webhook never called, file kept
    FailedTranscription,

    /// Transcript produced but delivery failed; file kept
    FailedDelivery,
}

impl ProcessingOutcome {
    /// Whether the transcript reached the webhook
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::DeliveredAndDeleted | Self::DeliveredKept)
    }
}

impl From<ProcessingOutcome> for AttemptOutcome {
    fn from(outcome: ProcessingOutcome) -> Self {
        match outcome {
            ProcessingOutcome::DeliveredAndDeleted => AttemptOutcome::DeliveredDeleted,
            ProcessingOutcome::DeliveredKept => AttemptOutcome::DeliveredKept,
            ProcessingOutcome::FailedTranscription | ProcessingOutcome::FailedDelivery => {
                AttemptOutcome::Failed
            }
        }
    }
}

/// Orchestrates the per-file stages against the configured clients
pub struct FileProcessor<T, S> {
    transcriber: T,
    sink: S,
    delete_after: bool,
}

impl<T: Transcriber, S: TranscriptSink> FileProcessor<T, S> {
    pub fn new(transcriber: T, sink: S, delete_after: bool) -> Self {
        Self {
            transcriber,
            sink,
            delete_after,
        }
    }

    /// Process one file to a terminal outcome. Never returns an error; the
    /// outcome is the whole story and the supervisor must keep running.
    pub async fn process(&self, path: &Path) -> ProcessingOutcome {
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        // Metadata feeds the payload; a vanished file fails the run early
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!("{} disappeared before processing: {}", file_name, e);
                return ProcessingOutcome::FailedTranscription;
            }
        };
        let file_size = meta.len();

        tracing::info!("Processing {} ({:.1} KB)", file_name, file_size as f64 / 1024.0);

        let transcript = match self.transcriber.transcribe(path).await {
            Ok(transcript) => {
                tracing::info!("Transcript for {}: {}", file_name, preview(&transcript.text));
                transcript
            }
            Err(e) => {
                tracing::error!("Transcription failed for {}: {}", file_name, e);
                return ProcessingOutcome::FailedTranscription;
            }
        };

        let recorded_at: DateTime<Local> = meta
            .modified()
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| Local::now());

        let payload = HookPayload::new(
            file_name.clone(),
            transcript.text,
            recorded_at,
            transcript.duration_seconds,
            file_size,
        );

        if let Err(e) = self.sink.deliver(&payload).await {
            tracing::error!("Webhook delivery failed for {}: {}", file_name, e);
            return ProcessingOutcome::FailedDelivery;
        }
        tracing::info!("Webhook delivered for {}", file_name);

        if !self.delete_after {
            return ProcessingOutcome::DeliveredKept;
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                tracing::info!("Deleted {}", file_name);
                ProcessingOutcome::DeliveredAndDeleted
            }
            Err(e) => {
                // Transcript already delivered; losing the delete is a
                // warning, not a retryable failure
                tracing::warn!("Failed to delete {} after delivery: {}", file_name, e);
                ProcessingOutcome::DeliveredKept
            }
        }
    }
}

/// First 100 characters, for logs
fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(100).collect();
    if preview.len() < text.len() {
        preview.push('…');
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "x".repeat(300);
        let preview = preview(&long);
        assert!(preview.chars().count() <= 101);
        assert!(preview.ends_with('…'));
        assert_eq!(super::preview("short"), "short");
    }

    #[test]
    fn test_outcome_mapping() {
        assert!(ProcessingOutcome::DeliveredAndDeleted.is_delivered());
        assert!(ProcessingOutcome::DeliveredKept.is_delivered());
        assert!(!ProcessingOutcome::FailedTranscription.is_delivered());
        assert!(!ProcessingOutcome::FailedDelivery.is_delivered());

        assert_eq!(
            AttemptOutcome::from(ProcessingOutcome::FailedDelivery),
            AttemptOutcome::Failed
        );
        assert_eq!(
            AttemptOutcome::from(ProcessingOutcome::DeliveredAndDeleted),
            AttemptOutcome::DeliveredDeleted
        );
    }
}
