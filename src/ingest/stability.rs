//! File stability detection.
//!
//! A file is safe to read once its size and mtime are unchanged across two
//! successive samples and it has been idle for at least the minimum age.
//! Files that keep changing are simply re-checked on the next scan cycle;
//! there is no timeout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Size + mtime pair identifying one version of a file's content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSignature {
    /// File size in bytes
    pub size: u64,

    /// Last modification time
    pub mtime: SystemTime,
}

impl FileSignature {
    /// Sample a signature from disk
    pub fn probe(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let mtime = meta.modified()?;
        Ok(Self {
            size: meta.len(),
            mtime,
        })
    }

    /// Signature from already-fetched metadata; `None` when the platform
    /// exposes no mtime.
    pub fn from_metadata(meta: &std::fs::Metadata) -> Option<Self> {
        Some(Self {
            size: meta.len(),
            mtime: meta.modified().ok()?,
        })
    }

    /// Time since last modification, zero if mtime is in the future
    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.mtime)
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug)]
struct PendingFile {
    signature: FileSignature,
    checks: u32,
}

/// Tracks candidate files across scan cycles and decides when each one has
/// finished being written.
#[derive(Debug)]
pub struct StabilityDetector {
    min_age: Duration,
    pending: HashMap<PathBuf, PendingFile>,
}

impl StabilityDetector {
    pub fn new(min_age: Duration) -> Self {
        Self {
            min_age,
            pending: HashMap::new(),
        }
    }

    /// Observe a candidate file. Returns its signature once the file is
    /// stable: unchanged since the previous sample and idle for at least
    /// the minimum age. A file already idle that long on first sighting is
    /// stable immediately (the writer finished before we ever saw it).
    pub fn observe(&mut self, path: &Path) -> Option<FileSignature> {
        let meta = match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta,
            _ => {
                // Gone or not a regular file; forget it
                self.pending.remove(path);
                return None;
            }
        };

        let signature = match FileSignature::from_metadata(&meta) {
            Some(signature) => signature,
            None => {
                self.pending.remove(path);
                return None;
            }
        };

        let stable = match self.pending.get_mut(path) {
            Some(entry) if entry.signature == signature => {
                entry.checks += 1;
                signature.age() >= self.min_age
            }
            Some(entry) => {
                entry.signature = signature;
                entry.checks += 1;
                if entry.checks % 10 == 0 {
                    tracing::debug!(
                        "{} still changing after {} checks",
                        path.display(),
                        entry.checks
                    );
                }
                false
            }
            None => {
                if signature.age() >= self.min_age {
                    return Some(signature);
                }
                tracing::debug!(
                    "{} too new (age {:.1}s), waiting for it to settle",
                    path.display(),
                    signature.age().as_secs_f64()
                );
                self.pending.insert(
                    path.to_path_buf(),
                    PendingFile {
                        signature,
                        checks: 1,
                    },
                );
                false
            }
        };

        if stable {
            self.pending.remove(path);
            return Some(signature);
        }
        None
    }

    /// Number of files currently waiting to stabilize
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
