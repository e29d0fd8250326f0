//! voice-ingest - audio intake → transcription → webhook pipeline
//!
//! A single-purpose pipeline stage: it watches a directory for newly
//! written audio recordings, transcribes each via an HTTP speech-to-text
//! service, delivers the transcript plus metadata to an OpenClaw webhook,
//! and removes the source file after a successful delivery.
//!
//! # Architecture
//!
//! - `ingest`: file discovery, stability detection, dispatch dedup
//! - `adapters`: HTTP clients for the STT service and the webhook
//! - `pipeline`: per-file state machine and the supervising watch loop
//! - `config`: environment-based configuration
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Watch and process until stopped
//! voice-ingest run
//!
//! # One pass over the directory
//! voice-ingest scan
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod ingest;
pub mod pipeline;

// Re-export main types at crate root for convenience
pub use adapters::{
    HookClient, HookError, HookPayload, SttClient, SttError, Transcriber, Transcript,
    TranscriptSink,
};
pub use config::{Config, ConfigError};
pub use ingest::{Candidate, FileSignature, FileTracker, IntakeWatcher, StabilityDetector};
pub use pipeline::{FileProcessor, ProcessingOutcome};
