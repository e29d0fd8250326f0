//! Clients for the external HTTP services the pipeline talks to.
//!
//! The processor is generic over the two traits below so its state machine
//! can be exercised against fakes; the real `reqwest` implementations live
//! in `stt` and `hook`. Neither client retries internally.

pub mod hook;
pub mod stt;

use std::path::Path;

use async_trait::async_trait;

pub use hook::{HookClient, HookError, HookPayload};
pub use stt::{SttClient, SttError, Transcript};

/// Speech-to-text backend
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one audio file. No side effects on the file.
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, SttError>;
}

/// Downstream destination for finished transcripts
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    /// Deliver one payload. Success is a 2xx acknowledgment.
    async fn deliver(&self, payload: &HookPayload) -> Result<(), HookError>;
}
