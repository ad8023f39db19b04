//! Oldest-first file selection.
//!
//! The watched directory is polled rather than watched with inotify so the
//! bridge also works on network mounts where the upstream drop lands.
//! Each call observes the directory once and names at most one file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::debug;

// ── CandidateFile ────────────────────────────────────────────────

/// A regular file as seen at selection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub len: u64,
}

impl CandidateFile {
    /// Final path component, when it is valid UTF-8.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Time since the last modification. A timestamp in the future counts
    /// as zero age.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.modified).unwrap_or(Duration::ZERO)
    }
}

// ── SelectOutcome ────────────────────────────────────────────────

/// Result of one look at the watched directory.
#[derive(Debug)]
pub enum SelectOutcome {
    /// The oldest regular file, ready to be processed.
    Selected(CandidateFile),
    /// The oldest file was modified too recently; its writer may still be
    /// appending to it.
    Unsettled(CandidateFile),
    /// The directory holds no regular files.
    Empty,
    /// The path does not exist or is not a directory.
    DirectoryMissing,
    /// The directory could not be inspected or listed.
    Unreadable(std::io::Error),
}

/// Pick the file with the smallest modification time, breaking ties by path.
pub fn pick_oldest(candidates: Vec<CandidateFile>) -> Option<CandidateFile> {
    candidates
        .into_iter()
        .min_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)))
}

/// Look at `directory` and return its oldest regular file.
///
/// Subdirectories and special files are ignored. Entries that vanish
/// between listing and `stat` are skipped. When `min_age` is non-zero, a
/// candidate younger than that is reported as [`SelectOutcome::Unsettled`].
pub async fn select_oldest(directory: &Path, min_age: Duration) -> SelectOutcome {
    match tokio::fs::metadata(directory).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return SelectOutcome::DirectoryMissing,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return SelectOutcome::DirectoryMissing;
        }
        Err(e) => return SelectOutcome::Unreadable(e),
    }

    let mut entries = match tokio::fs::read_dir(directory).await {
        Ok(entries) => entries,
        Err(e) => return SelectOutcome::Unreadable(e),
    };

    let mut candidates = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => return SelectOutcome::Unreadable(e),
        };
        let path = entry.path();

        // Follows symlinks, so a link to a regular file is a candidate.
        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "skipping entry");
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }
        let modified = match meta.modified() {
            Ok(t) => t,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "no modification time");
                continue;
            }
        };

        candidates.push(CandidateFile {
            path,
            modified,
            len: meta.len(),
        });
    }

    match pick_oldest(candidates) {
        None => SelectOutcome::Empty,
        Some(file) if !min_age.is_zero() && file.age(SystemTime::now()) < min_age => {
            SelectOutcome::Unsettled(file)
        }
        Some(file) => SelectOutcome::Selected(file),
    }
}

// ── Tests ────────────────────────────────────────────────────────
