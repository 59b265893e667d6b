//! Reporting interface between the core and its presentation.
//!
//! The pipeline and orchestrator never print; they describe progress through
//! a [`Reporter`]. The library ships [`TracingReporter`], which turns events
//! into structured log records; the binary supplies a console reporter.

use tracing::{info, warn};

use crate::download::{DownloadOutcome, SkipReason};
use crate::orchestrator::BatchReport;

/// Kind of collection a batch walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Album,
    Artist,
    Playlist,
    Show,
    /// The user's saved tracks.
    Library,
}

impl BatchKind {
    /// Lowercase label used in logs and headings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Artist => "artist",
            Self::Playlist => "playlist",
            Self::Show => "show",
            Self::Library => "library",
        }
    }
}

impl std::fmt::Display for BatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer of download progress. Every method defaults to doing nothing.
pub trait Reporter: Send + Sync {
    /// A collection (album, playlist, show, discography, library) is starting.
    fn batch_started(&self, _kind: BatchKind, _name: &str) {}

    /// A collection finished.
    fn batch_finished(&self, _name: &str, _report: &BatchReport) {}

    /// Streaming of an item started.
    fn item_started(&self, _label: &str, _size_hint: Option<u64>) {}

    /// Bytes of the current item received so far.
    fn item_progress(&self, _received: u64) {}

    /// An item reached its final outcome.
    fn item_finished(&self, _label: &str, _outcome: &DownloadOutcome) {}

    /// A collection entry cannot be downloaded at all (removed or local track).
    fn unresolvable(&self, _label: &str, _reason: &str) {}

    /// A non-fatal problem worth the user's attention.
    fn warning(&self, _message: &str) {}
}

/// Reporter that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {}

/// Reporter that logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn batch_started(&self, kind: BatchKind, name: &str) {
        info!(kind = %kind, name, "batch started");
    }

    fn batch_finished(&self, name: &str, report: &BatchReport) {
        info!(
            name,
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            "batch finished"
        );
    }

    fn item_finished(&self, label: &str, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded { path } => {
                info!(item = label, path = %path.display(), "downloaded");
            }
            DownloadOutcome::Skipped(reason) => info!(item = label, reason = %reason, "skipped"),
            DownloadOutcome::Failed(error) => warn!(item = label, error = %error, "failed"),
        }
    }

    fn unresolvable(&self, label: &str, reason: &str) {
        warn!(item = label, reason, "unresolvable entry skipped");
    }

    fn warning(&self, message: &str) {
        warn!("{message}");
    }
}

/// One-line, user-facing description of an outcome.
#[must_use]
pub fn outcome_line(label: &str, outcome: &DownloadOutcome) -> String {
    match outcome {
        DownloadOutcome::Downloaded { .. } => format!("###   DOWNLOADED: {label}   ###"),
        DownloadOutcome::Skipped(SkipReason::AlreadyExists) => {
            format!("###   SKIPPING: {label} (SONG ALREADY EXISTS)   ###")
        }
        DownloadOutcome::Skipped(reason) => format!("###   SKIPPING: {label} ({reason})   ###"),
        DownloadOutcome::Failed(error) => format!("###   FAILED: {label} ({error})   ###"),
    }
}
