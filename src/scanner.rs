//! Directory scanner
//!
//! Walks a tree, picks one entry point per archive set and feeds each one through the
//! [`Pipeline`]. Walk errors and per-candidate failures are logged and stepped over; the
//! walk always finishes.

use crate::archiver::Archiver;
use crate::config::{Config, has_extension};
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::types::{Candidate, Event, ScanSummary};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// `.partNN` immediately before the extension, captured digits
#[allow(clippy::expect_used)]
static TRAILING_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.part(\d+)\.[^.]+$").expect("valid regex"));

/// `.partNN` anywhere in the name
#[allow(clippy::expect_used)]
static ANY_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.part\d+").expect("valid regex"));

/// Whether `file_name` is the entry point of its volume set
///
/// - `movie.rar` (no `.partNN` marker): standalone archive, yes
/// - `movie.part1.rar`, `movie.part01.rar`, `movie.part001.rar`: first volume, yes
/// - `movie.part2.rar`, `movie.part02.rar`, ...: continuation, no
/// - `movie.part03.extras.rar`: marker not in volume position, no
pub fn is_primary_volume(file_name: &str) -> bool {
    if let Some(caps) = TRAILING_PART.captures(file_name) {
        return caps
            .get(1)
            .is_some_and(|digits| digits.as_str().trim_start_matches('0') == "1");
    }
    !ANY_PART.is_match(file_name)
}

/// Whether `path` has an archive extension and is a primary volume
pub fn is_candidate(path: &Path, archive_extensions: &[String]) -> bool {
    if !has_extension(path, archive_extensions) {
        return false;
    }
    path.file_name()
        .map(|name| is_primary_volume(&name.to_string_lossy()))
        .unwrap_or(false)
}

/// Walk `root` and return every candidate, sorted by path, plus the number of walk
/// errors that were skipped
pub fn collect_candidates(root: &Path, archive_extensions: &[String]) -> (Vec<Candidate>, usize) {
    let mut candidates = Vec::new();
    let mut walk_errors = 0;

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(?root, error = %e, "error while walking directory");
                walk_errors += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !has_extension(path, archive_extensions) {
            continue;
        }

        if !is_candidate(path, archive_extensions) {
            debug!(?path, "skipping continuation volume");
            continue;
        }

        if let Some(candidate) = Candidate::from_path(path) {
            debug!(?path, "found candidate archive");
            candidates.push(candidate);
        }
    }

    candidates.sort();
    (candidates, walk_errors)
}

/// Scans a directory tree and processes every candidate archive in turn
pub struct Scanner {
    config: Arc<Config>,
    pipeline: Pipeline,
    event_tx: broadcast::Sender<Event>,
    archiver: Arc<dyn Archiver>,
    stop: AtomicBool,
}

impl Scanner {
    /// Create a scanner with its own event channel
    pub fn new(config: Arc<Config>, archiver: Arc<dyn Archiver>) -> Self {
        let (event_tx, _rx) = broadcast::channel(1024);
        let pipeline = Pipeline::new(event_tx.clone(), config.clone(), archiver.clone());
        Self {
            config,
            pipeline,
            event_tx,
            archiver,
            stop: AtomicBool::new(false),
        }
    }

    /// Ask a running scan to end after the archive it is working on
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Subscribe to scan events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Validate configuration, probe the archiver, then scan the configured root
    ///
    /// # Errors
    ///
    /// Only environment problems are returned: invalid configuration or a missing
    /// archiver. Everything that goes wrong with individual archives is logged and
    /// reflected in the summary.
    pub async fn run(&self) -> Result<ScanSummary> {
        self.config.validate()?;

        let banner = self.archiver.probe().await?;
        info!(archiver = self.archiver.name(), %banner, "archiver found");

        if self.config.retention.extra_removals_requested() {
            warn!(
                extensions = ?self.config.retention.extra_remove_extensions,
                "extra removal extensions are reserved and not applied"
            );
        }

        Ok(self.scan(&self.config.scan.root_dir).await)
    }

    /// Walk `root` and process every candidate, one at a time
    pub async fn scan(&self, root: &Path) -> ScanSummary {
        let root = match std::path::absolute(root) {
            Ok(root) => root,
            Err(e) => {
                warn!(?root, error = %e, "cannot resolve scan root");
                root.to_path_buf()
            }
        };
        info!(?root, "scanning directory");
        self.event_tx
            .send(Event::ScanStarted { root: root.clone() })
            .ok();

        let (candidates, walk_errors) = match self.collect(root.clone()).await {
            Ok(found) => found,
            Err(e) => {
                warn!(?root, error = %e, "directory walk did not complete");
                (Vec::new(), 1)
            }
        };

        let mut summary = ScanSummary {
            walk_errors,
            ..Default::default()
        };

        for candidate in &candidates {
            if self.stop.load(Ordering::SeqCst) {
                info!("stop requested, ending scan");
                summary.interrupted = true;
                break;
            }

            // an earlier cleanup in the same directory may have removed it
            if tokio::fs::metadata(&candidate.path).await.is_err() {
                info!(archive = ?candidate.path, "archive no longer exists, skipping");
                continue;
            }

            summary.candidates += 1;
            self.event_tx
                .send(Event::CandidateFound {
                    path: candidate.path.clone(),
                })
                .ok();

            match self.pipeline.process(candidate).await {
                Ok(report) => {
                    let warnings = report.extracted_with_warnings();
                    info!(
                        archive = %candidate.file_name(),
                        records = report.verification.records_checked,
                        warnings,
                        deleted = report.cleanup.deleted.len(),
                        "archive processed"
                    );
                    summary.processed += 1;
                    if warnings {
                        summary.with_warnings += 1;
                    }
                    self.event_tx
                        .send(Event::Processed {
                            path: candidate.path.clone(),
                            warnings,
                        })
                        .ok();
                }
                Err(Error::Pipeline(e)) => {
                    warn!(archive = %candidate.file_name(), stage = %e.stage(), error = %e, "skipping archive");
                    summary.skipped.push((candidate.path.clone(), e.stage()));
                    self.event_tx
                        .send(Event::Skipped {
                            path: candidate.path.clone(),
                            stage: e.stage(),
                            reason: e.to_string(),
                        })
                        .ok();
                }
                Err(e) => {
                    // stages only fail with PipelineError; anything else is unexpected
                    // but still scoped to this archive
                    warn!(archive = %candidate.file_name(), error = %e, "skipping archive");
                }
            }
        }

        info!(
            candidates = summary.candidates,
            processed = summary.processed,
            with_warnings = summary.with_warnings,
            skipped = summary.skipped.len(),
            walk_errors = summary.walk_errors,
            interrupted = summary.interrupted,
            "scan complete"
        );
        self.event_tx
            .send(Event::ScanComplete {
                candidates: summary.candidates,
                processed: summary.processed,
            })
            .ok();

        summary
    }

    async fn collect(&self, root: PathBuf) -> Result<(Vec<Candidate>, usize)> {
        let extensions = self.config.scan.archive_extensions.clone();
        tokio::task::spawn_blocking(move || collect_candidates(&root, &extensions))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(format!("walk task panicked: {}", e))))
    }
}
