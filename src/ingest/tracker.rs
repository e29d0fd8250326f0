//! Process-scoped tracking of in-flight and attempted files.
//!
//! The tracker is the single piece of shared mutable state between the
//! scanner and the worker pool. Membership checks and updates go through
//! one mutex. Entries start empty at startup, a claim marks a path
//! in-flight, and the terminal outcome of its processor run either records
//! an attempt (file kept on disk) or drops the path entirely (file
//! deleted).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::stability::FileSignature;

/// How a dispatch ended, as far as future scan cycles care
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Transcript delivered and the source file removed from disk
    DeliveredDeleted,

    /// Transcript delivered, source file intentionally kept
    DeliveredKept,

    /// Transcription or delivery failed; file kept for a later cycle
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct Attempt {
    signature: FileSignature,
    outcome: AttemptOutcome,
    at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    in_flight: HashSet<PathBuf>,
    attempts: HashMap<PathBuf, Attempt>,
}

/// In-flight/attempted registry shared between the scanner and workers
#[derive(Debug)]
pub struct FileTracker {
    failed_retry: Duration,
    inner: Mutex<Inner>,
}

impl FileTracker {
    /// `failed_retry` is the cooldown after which a failed, unchanged file
    /// becomes eligible again; zero disables time-based retry (only a
    /// signature change requalifies the file).
    pub fn new(failed_retry: Duration) -> Self {
        Self {
            failed_retry,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Claim a path for processing. Refused while the path is in flight,
    /// after a delivered attempt with the same signature, or after a failed
    /// attempt with the same signature that is still inside the retry
    /// cooldown.
    pub fn try_claim(&self, path: &Path, signature: FileSignature) -> bool {
        let mut inner = self.inner.lock().expect("tracker lock poisoned");

        if inner.in_flight.contains(path) {
            return false;
        }

        if let Some(attempt) = inner.attempts.get(path) {
            if attempt.signature == signature {
                match attempt.outcome {
                    AttemptOutcome::DeliveredDeleted | AttemptOutcome::DeliveredKept => {
                        return false;
                    }
                    AttemptOutcome::Failed => {
                        if self.failed_retry.is_zero() || attempt.at.elapsed() < self.failed_retry {
                            return false;
                        }
                    }
                }
            }
        }

        inner.in_flight.insert(path.to_path_buf());
        true
    }

    /// Record the terminal outcome of a dispatch and release the path.
    /// A deleted file leaves no attempt record; there is nothing on disk
    /// left to skip.
    pub fn release(&self, path: &Path, signature: FileSignature, outcome: AttemptOutcome) {
        let mut inner = self.inner.lock().expect("tracker lock poisoned");
        inner.in_flight.remove(path);

        match outcome {
            AttemptOutcome::DeliveredDeleted => {
                inner.attempts.remove(path);
            }
            AttemptOutcome::DeliveredKept | AttemptOutcome::Failed => {
                inner.attempts.insert(
                    path.to_path_buf(),
                    Attempt {
                        signature,
                        outcome,
                        at: Instant::now(),
                    },
                );
            }
        }
    }

    /// Drop attempt records for files no longer on disk, so a future file
    /// reusing the name starts clean.
    pub fn prune_missing(&self) {
        let mut inner = self.inner.lock().expect("tracker lock poisoned");
        inner.attempts.retain(|path, _| path.exists());
    }

    /// Number of paths currently claimed by processor runs
    pub fn in_flight_len(&self) -> usize {
        self.inner.lock().expect("tracker lock poisoned").in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn signature(size: u64) -> FileSignature {
        FileSignature {
            size,
            mtime: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        }
    }

    #[test]
    fn test_claim_blocks_second_claim() {
        let tracker = FileTracker::new(Duration::from_secs(300));
        let path = Path::new("/data/voice/memo.m4a");

        assert!(tracker.try_claim(path, signature(10)));
        assert!(!tracker.try_claim(path, signature(10)));
        assert_eq!(tracker.in_flight_len(), 1);
    }

    #[test]
    fn test_delivered_kept_never_reclaimed_unchanged() {
        let tracker = FileTracker::new(Duration::from_secs(300));
        let path = Path::new("/data/voice/memo.m4a");

        assert!(tracker.try_claim(path, signature(10)));
        tracker.release(path, signature(10), AttemptOutcome::DeliveredKept);

        assert!(!tracker.try_claim(path, signature(10)));
        // A new recording under the same name is a fresh file
        assert!(tracker.try_claim(path, signature(42)));
    }

    #[test]
    fn test_deleted_leaves_no_record() {
        let tracker = FileTracker::new(Duration::from_secs(300));
        let path = Path::new("/data/voice/memo.m4a");

        assert!(tracker.try_claim(path, signature(10)));
        tracker.release(path, signature(10), AttemptOutcome::DeliveredDeleted);

        assert!(tracker.try_claim(path, signature(10)));
    }

    #[test]
    fn test_failed_unchanged_waits_for_cooldown() {
        let tracker = FileTracker::new(Duration::from_millis(20));
        let path = Path::new("/data/voice/memo.m4a");

        assert!(tracker.try_claim(path, signature(10)));
        tracker.release(path, signature(10), AttemptOutcome::Failed);

        assert!(!tracker.try_claim(path, signature(10)));
        std::thread::sleep(Duration::from_millis(30));
        assert!(tracker.try_claim(path, signature(10)));
    }

    #[test]
    fn test_failed_with_zero_cooldown_needs_signature_change() {
        let tracker = FileTracker::new(Duration::ZERO);
        let path = Path::new("/data/voice/memo.m4a");

        assert!(tracker.try_claim(path, signature(10)));
        tracker.release(path, signature(10), AttemptOutcome::Failed);

        std::thread::sleep(Duration::from_millis(5));
        assert!(!tracker.try_claim(path, signature(10)));
        assert!(tracker.try_claim(path, signature(11)));
    }

    #[test]
    fn test_prune_missing_clears_stale_attempts() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("memo.m4a");
        std::fs::write(&path, b"audio").unwrap();

        let tracker = FileTracker::new(Duration::from_secs(300));
        assert!(tracker.try_claim(&path, signature(10)));
        tracker.release(&path, signature(10), AttemptOutcome::Failed);

        // File still on disk: record survives pruning
        tracker.prune_missing();
        assert!(!tracker.try_claim(&path, signature(10)));

        std::fs::remove_file(&path).unwrap();
        tracker.prune_missing();
        assert!(tracker.try_claim(&path, signature(10)));
    }
}
