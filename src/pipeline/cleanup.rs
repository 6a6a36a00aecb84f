//! Retention cleanup stage
//!
//! After a successful extraction, everything in the archive's directory that is neither
//! whitelisted nor large is deleted. The size rule is a safety net: a big file with an
//! unknown extension is assumed to be payload.

use crate::config::{RetentionConfig, has_extension};
use crate::error::Result;
use crate::types::Event;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Why a file survives cleanup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepReason {
    /// The path is the directory being cleaned
    Root,
    /// Extension is in the keep list
    Whitelisted,
    /// Larger than the minimum-size threshold
    Large,
    /// Dry-run mode; the file would otherwise be deleted
    DryRun,
}

/// Per-file retention verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionDecision {
    /// Leave the file alone
    Keep(KeepReason),
    /// Remove the file
    Delete,
}

impl RetentionDecision {
    /// Whether the file will be removed
    pub fn is_delete(self) -> bool {
        matches!(self, Self::Delete)
    }
}

/// Decide whether a file survives cleanup
///
/// Deleted if and only if: extension not whitelisted, size not above the threshold, path
/// is not the root, and dry-run is off.
pub fn decide(path: &Path, size: u64, root: &Path, retention: &RetentionConfig) -> RetentionDecision {
    if path == root {
        RetentionDecision::Keep(KeepReason::Root)
    } else if has_extension(path, &retention.keep_extensions) {
        RetentionDecision::Keep(KeepReason::Whitelisted)
    } else if size > retention.min_size_bytes {
        RetentionDecision::Keep(KeepReason::Large)
    } else if retention.dry_run {
        RetentionDecision::Keep(KeepReason::DryRun)
    } else {
        RetentionDecision::Delete
    }
}

/// What a cleanup pass did
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files removed
    pub deleted: Vec<PathBuf>,
    /// Files kept by the whitelist or size rule
    pub kept: usize,
    /// Files that would have been removed but dry-run was on
    pub spared: Vec<PathBuf>,
    /// Files whose removal failed, with the error
    pub failed: Vec<(PathBuf, String)>,
    /// Entries the walk could not read
    pub walk_errors: usize,
}

/// Execute the cleanup stage
pub(crate) async fn run_cleanup_stage(
    dir: &Path,
    event_tx: &broadcast::Sender<Event>,
    retention: &RetentionConfig,
) -> Result<CleanupReport> {
    debug!(?dir, dry_run = retention.dry_run, "running cleanup stage");

    event_tx
        .send(Event::Cleaning {
            dir: dir.to_path_buf(),
        })
        .ok();

    // walkdir and remove_file are blocking
    let dir_owned = dir.to_path_buf();
    let retention_owned = retention.clone();
    let report = tokio::task::spawn_blocking(move || clean_directory(&dir_owned, &retention_owned))
        .await
        .map_err(|e| std::io::Error::other(format!("cleanup task panicked: {}", e)))?;

    event_tx
        .send(Event::CleanupComplete {
            dir: dir.to_path_buf(),
            deleted: report.deleted.len(),
            kept: report.kept + report.spared.len(),
        })
        .ok();

    Ok(report)
}

/// Walk `dir` recursively and delete every file the retention policy does not protect
///
/// Directories are never removed. Failures are logged and counted; the walk always runs
/// to the end. Running it twice on the same directory deletes nothing the second time.
pub fn clean_directory(dir: &Path, retention: &RetentionConfig) -> CleanupReport {
    let mut report = CleanupReport::default();

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(?dir, error = %e, "failed to read entry during cleanup");
                report.walk_errors += 1;
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                // unknown size: cannot prove the file is disposable
                warn!(?path, error = %e, "failed to stat file during cleanup, keeping it");
                report.walk_errors += 1;
                continue;
            }
        };

        match decide(path, size, dir, retention) {
            RetentionDecision::Delete => match std::fs::remove_file(path) {
                Ok(()) => {
                    debug!(?path, size, "deleted file");
                    report.deleted.push(path.to_path_buf());
                }
                Err(e) => {
                    warn!(?path, error = %e, "failed to delete file");
                    report.failed.push((path.to_path_buf(), e.to_string()));
                }
            },
            RetentionDecision::Keep(KeepReason::DryRun) => {
                info!(?path, size, "dry run, deletion skipped");
                report.spared.push(path.to_path_buf());
            }
            RetentionDecision::Keep(reason) => {
                debug!(?path, size, ?reason, "keeping file");
                report.kept += 1;
            }
        }
    }

    info!(
        ?dir,
        deleted = report.deleted.len(),
        kept = report.kept,
        spared = report.spared.len(),
        failed = report.failed.len(),
        "cleanup complete"
    );

    report
}
