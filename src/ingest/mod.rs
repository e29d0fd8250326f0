//! Intake of audio files from the watch directory.
//!
//! Three pieces cooperate here:
//! - `stability`: decides when a file has finished being written
//! - `tracker`: in-flight/attempted registry shared with the worker pool
//! - `watcher`: event-driven or polling discovery of candidate files

pub mod stability;
pub mod tracker;
pub mod watcher;

pub use stability::{FileSignature, StabilityDetector};
pub use tracker::{AttemptOutcome, FileTracker};
pub use watcher::{is_audio_file, Candidate, IntakeWatcher, WatchHandle, WatcherConfig, WatcherError, AUDIO_EXTENSIONS};
