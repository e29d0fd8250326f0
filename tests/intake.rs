//! Intake Integration Tests
//!
//! Scanner, stability and dedup behavior over a real temp directory.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use tempfile::TempDir;

use voice_ingest::ingest::{
    AttemptOutcome, FileTracker, IntakeWatcher, StabilityDetector, WatcherConfig,
};

fn backdate(path: &Path, secs: u64) {
    let mtime = SystemTime::now() - Duration::from_secs(secs);
    filetime::set_file_mtime(path, FileTime::from_system_time(mtime)).unwrap();
}

fn watcher_for(temp: &TempDir, tracker: Arc<FileTracker>) -> IntakeWatcher {
    let config = WatcherConfig {
        watch_dir: temp.path().to_path_buf(),
        poll_interval: Duration::from_secs(5),
        min_file_age: Duration::from_secs(5),
        force_poll: true,
    };
    IntakeWatcher::new(config, tracker)
}

#[tokio::test]
async fn test_scan_emits_stable_audio_only() {
    let temp = TempDir::new().unwrap();

    let memo = temp.path().join("memo.m4a");
    std::fs::write(&memo, b"audio").unwrap();
    backdate(&memo, 60);

    let notes = temp.path().join("notes.txt");
    std::fs::write(&notes, b"not audio").unwrap();
    backdate(&notes, 60);

    // Still being written: mtime is fresh
    let fresh = temp.path().join("fresh.wav");
    std::fs::write(&fresh, b"partial").unwrap();

    let tracker = Arc::new(FileTracker::new(Duration::from_secs(300)));
    let watcher = watcher_for(&temp, tracker);
    let mut detector = StabilityDetector::new(Duration::from_secs(5));

    let candidates = watcher.scan_once(&mut detector).await.unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].path, memo);
}

#[tokio::test]
async fn test_claimed_file_not_emitted_again() {
    let temp = TempDir::new().unwrap();
    let memo = temp.path().join("memo.m4a");
    std::fs::write(&memo, b"audio").unwrap();
    backdate(&memo, 60);

    let tracker = Arc::new(FileTracker::new(Duration::from_secs(300)));
    let watcher = watcher_for(&temp, tracker);
    let mut detector = StabilityDetector::new(Duration::from_secs(5));

    let first = watcher.scan_once(&mut detector).await.unwrap();
    assert_eq!(first.len(), 1);

    // Still in flight: the same path must not be dispatched twice
    let second = watcher.scan_once(&mut detector).await.unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_failed_file_requalifies_on_signature_change() {
    let temp = TempDir::new().unwrap();
    let memo = temp.path().join("memo.m4a");
    std::fs::write(&memo, b"audio").unwrap();
    backdate(&memo, 60);

    let tracker = Arc::new(FileTracker::new(Duration::from_secs(300)));
    let watcher = watcher_for(&temp, tracker.clone());
    let mut detector = StabilityDetector::new(Duration::from_secs(5));

    let first = watcher.scan_once(&mut detector).await.unwrap();
    assert_eq!(first.len(), 1);
    let candidate = &first[0];

    // Terminal failure; unchanged file stays skipped inside the cooldown
    tracker.release(&candidate.path, candidate.signature, AttemptOutcome::Failed);
    let unchanged = watcher.scan_once(&mut detector).await.unwrap();
    assert!(unchanged.is_empty());

    // A re-recorded file has a new signature and qualifies again
    std::fs::write(&memo, b"audio, take two").unwrap();
    backdate(&memo, 30);
    let requalified = watcher.scan_once(&mut detector).await.unwrap();
    assert_eq!(requalified.len(), 1);
}

#[tokio::test]
async fn test_settling_file_needs_unchanged_samples() {
    let temp = TempDir::new().unwrap();
    let memo = temp.path().join("memo.m4a");
    std::fs::write(&memo, b"chunk").unwrap();

    let tracker = Arc::new(FileTracker::new(Duration::from_secs(300)));
    let watcher = watcher_for(&temp, tracker);
    let mut detector = StabilityDetector::new(Duration::from_secs(5));

    // Fresh file: first sample only records it
    assert!(watcher.scan_once(&mut detector).await.unwrap().is_empty());

    // Writer finishes; mtime jumps back past the minimum age, but the
    // changed signature still costs one more confirming sample
    std::fs::write(&memo, b"chunk chunk chunk").unwrap();
    backdate(&memo, 60);
    assert!(watcher.scan_once(&mut detector).await.unwrap().is_empty());

    // Unchanged and old enough: dispatched
    let candidates = watcher.scan_once(&mut detector).await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].path, memo);
}

#[tokio::test]
async fn test_delivered_and_deleted_file_can_reuse_name() {
    let temp = TempDir::new().unwrap();
    let memo = temp.path().join("memo.m4a");
    std::fs::write(&memo, b"audio").unwrap();
    backdate(&memo, 60);

    let tracker = Arc::new(FileTracker::new(Duration::from_secs(300)));
    let watcher = watcher_for(&temp, tracker.clone());
    let mut detector = StabilityDetector::new(Duration::from_secs(5));

    let first = watcher.scan_once(&mut detector).await.unwrap();
    assert_eq!(first.len(), 1);
    let candidate = first[0].clone();

    // Success path: file removed from disk, tracking record dropped
    std::fs::remove_file(&memo).unwrap();
    tracker.release(&candidate.path, candidate.signature, AttemptOutcome::DeliveredDeleted);

    // A new recording synced under the same name is processed normally
    std::fs::write(&memo, b"different audio").unwrap();
    backdate(&memo, 60);
    let second = watcher.scan_once(&mut detector).await.unwrap();
    assert_eq!(second.len(), 1);
}

#[tokio::test]
async fn test_missing_watch_dir_is_an_error() {
    let temp = TempDir::new().unwrap();
    let config = WatcherConfig {
        watch_dir: temp.path().join("nope"),
        poll_interval: Duration::from_secs(5),
        min_file_age: Duration::from_secs(5),
        force_poll: true,
    };
    let tracker = Arc::new(FileTracker::new(Duration::from_secs(300)));
    let watcher = IntakeWatcher::new(config, tracker);

    let mut detector = StabilityDetector::new(Duration::from_secs(5));
    assert!(watcher.scan_once(&mut detector).await.is_err());
}
