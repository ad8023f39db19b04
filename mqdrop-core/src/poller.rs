//! The poll loop.
//!
//! Each cycle looks at the watched directory, picks the oldest settled
//! file, and hands it to a [`FileHandler`] unless its content matches the
//! last delivery. Cycles run strictly one after another with a fixed
//! sleep in between.
//!
//! ```text
//!  Idle ──► Scanning ──► Empty ─────────────────────────┐
//!                │                                      │
//!                └──► Selected ──► Unchanged ───────────┤
//!                         │                             ▼
//!                         └──► Changed ──► Delivering ──► Idle
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::delivery::DEFAULT_CHUNK_SIZE;
use crate::disposition::Disposition;
use crate::fingerprint::{Fingerprint, fingerprint_file, has_changed};
use crate::handler::FileHandler;
use crate::selector::{SelectOutcome, select_oldest};

// ── PollerConfig ─────────────────────────────────────────────────

/// Configuration for [`Poller`].
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Directory to watch.
    pub directory: PathBuf,
    /// Sleep between cycles.
    pub interval: Duration,
    /// Files modified more recently than this are left for a later cycle.
    pub min_file_age: Duration,
    /// Read buffer size when fingerprinting.
    pub chunk_size: usize,
    /// What to do with a file after it was delivered.
    pub disposition: Disposition,
}

impl PollerConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            interval: Duration::from_millis(1000),
            min_file_age: Duration::from_millis(1000),
            chunk_size: DEFAULT_CHUNK_SIZE,
            disposition: Disposition::Keep,
        }
    }
}

// ── Outcomes & stats ─────────────────────────────────────────────

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The watched directory does not exist.
    DirectoryMissing,
    /// No file to process.
    Empty,
    /// The oldest file is still being written.
    Unsettled,
    /// The directory exists but could not be listed; treated like an empty cycle.
    Unreadable,
    /// The oldest file matches the last delivery. A non-keep disposition is
    /// still applied so the next file can be reached.
    Unchanged,
    Delivered,
    /// Reading or delivery failed; the same file is retried next cycle.
    Failed,
}

impl CycleOutcome {
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Running totals since the poller was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub cycles: u64,
    pub delivered: u64,
    /// Cycles whose file matched the last delivery.
    pub skipped: u64,
    pub failed: u64,
}

// ── Poller ───────────────────────────────────────────────────────

/// Directory poller driving a [`FileHandler`].
///
/// The poller owns the dedup fingerprint and the run flag. Obtain
/// [`stop_handle`](Self::stop_handle) before calling [`run`](Self::run) to
/// stop it from another task.
pub struct Poller<H> {
    config: PollerConfig,
    handler: H,
    last: Option<Fingerprint>,
    stats: PollStats,
    running: Arc<AtomicBool>,
}

impl<H: FileHandler> Poller<H> {
    pub fn new(config: PollerConfig, handler: H) -> Self {
        Self {
            config,
            handler,
            last: None,
            stats: PollStats::default(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Clearing this flag ends [`run`](Self::run) after the current cycle.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Fingerprint of the last successful delivery.
    pub fn last_fingerprint(&self) -> Option<&Fingerprint> {
        self.last.as_ref()
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Poll until stopped.
    pub async fn run(&mut self) {
        info!(
            directory = %self.config.directory.display(),
            interval_ms = self.config.interval.as_millis() as u64,
            disposition = %self.config.disposition,
            "poller started"
        );

        while self.running.load(Ordering::SeqCst) {
            self.poll_once().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(self.config.interval).await;
        }

        let stats = self.stats;
        info!(
            cycles = stats.cycles,
            delivered = stats.delivered,
            skipped = stats.skipped,
            failed = stats.failed,
            "poller stopped"
        );
    }

    /// Run exactly one cycle.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        self.stats.cycles += 1;
        let directory = &self.config.directory;

        let file = match select_oldest(directory, self.config.min_file_age).await {
            SelectOutcome::Selected(file) => file,
            SelectOutcome::Empty => {
                debug!(directory = %directory.display(), "no files");
                return CycleOutcome::Empty;
            }
            SelectOutcome::DirectoryMissing => {
                warn!(directory = %directory.display(), "watched directory is missing");
                return CycleOutcome::DirectoryMissing;
            }
            SelectOutcome::Unsettled(file) => {
                debug!(file = %file.path.display(), "file still being written");
                return CycleOutcome::Unsettled;
            }
            SelectOutcome::Unreadable(e) => {
                warn!(directory = %directory.display(), error = %e, "cannot list directory");
                return CycleOutcome::Unreadable;
            }
        };

        let fingerprint = match fingerprint_file(&file.path, file.len, self.config.chunk_size).await
        {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                error!(file = %file.path.display(), stage = "read", error = %e, "cannot read file");
                self.stats.failed += 1;
                return CycleOutcome::Failed;
            }
        };

        if !has_changed(&fingerprint, self.last.as_ref()) {
            self.stats.skipped += 1;
            if matches!(self.config.disposition, Disposition::Keep) {
                debug!(file = %file.path.display(), %fingerprint, "unchanged since last delivery");
            } else {
                info!(
                    file = %file.path.display(),
                    disposition = %self.config.disposition,
                    "already delivered; applying disposition"
                );
                self.dispose(&file.path).await;
            }
            return CycleOutcome::Unchanged;
        }

        match self.handler.handle(&file).await {
            Ok(delivered) => {
                self.last = Some(delivered);
                self.stats.delivered += 1;
                self.dispose(&file.path).await;
                CycleOutcome::Delivered
            }
            Err(e) => {
                error!(
                    file = %file.path.display(),
                    stage = e.stage(),
                    error = %e,
                    "delivery failed"
                );
                self.stats.failed += 1;
                CycleOutcome::Failed
            }
        }
    }

    async fn dispose(&self, path: &Path) {
        match self.config.disposition.apply(path).await {
            Ok(Some(moved)) => debug!(file = %path.display(), to = %moved.display(), "archived"),
            Ok(None) => {}
            Err(e) => warn!(
                file = %path.display(),
                disposition = %self.config.disposition,
                error = %e,
                "post-delivery disposition failed"
            ),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
