//! Per-candidate processing pipeline
//!
//! Each candidate archive goes through, in order:
//! 1. Verify - SFV checksums of the files next to it
//! 2. Test - the archiver's integrity test
//! 3. Extract - into the archive's own directory
//! 4. Cleanup - prune everything the retention policy does not protect
//!
//! The first failing stage abandons the candidate. Cleanup only runs after a successful
//! extraction and never fails the candidate.

use crate::archiver::{Archiver, ExtractReport, TestReport};
use crate::checksum::VerificationResult;
use crate::config::Config;
use crate::error::Result;
use crate::types::{Candidate, Event};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

mod cleanup;
mod extract;
mod integrity;
mod verify;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use cleanup::{CleanupReport, KeepReason, RetentionDecision, clean_directory, decide};

use cleanup::run_cleanup_stage;
use extract::run_extract_stage;
use integrity::run_test_stage;
use verify::run_verify_stage;

/// What every stage reported for one candidate
#[must_use]
#[derive(Debug, Clone)]
pub struct ArchiveReport {
    /// Manifests and records checked before the archiver ran
    pub verification: VerificationResult,
    /// Integrity test outcome
    pub test: TestReport,
    /// Extraction outcome; `warnings` is set for a non-fatal non-zero exit
    pub extraction: ExtractReport,
    /// Files pruned afterwards
    pub cleanup: CleanupReport,
}

impl ArchiveReport {
    /// Extraction finished but the archiver exited non-zero
    pub fn extracted_with_warnings(&self) -> bool {
        self.extraction.warnings
    }
}

/// Pipeline executor
pub struct Pipeline {
    /// Event channel for emitting stage events
    event_tx: broadcast::Sender<Event>,
    /// Read-only settings shared by every stage
    config: Arc<Config>,
    /// External archiver for test and extract
    archiver: Arc<dyn Archiver>,
}

impl Pipeline {
    /// Create a new pipeline executor
    pub fn new(
        event_tx: broadcast::Sender<Event>,
        config: Arc<Config>,
        archiver: Arc<dyn Archiver>,
    ) -> Self {
        Self {
            event_tx,
            config,
            archiver,
        }
    }

    /// Run every stage for one candidate
    ///
    /// Returns every stage's report on success, or the `PipelineError` of the first stage
    /// that failed.
    pub async fn process(&self, candidate: &Candidate) -> Result<ArchiveReport> {
        info!(archive = ?candidate.path, "processing archive");

        let verification = run_verify_stage(candidate, &self.event_tx, &self.config).await?;
        let test = run_test_stage(candidate, &self.event_tx, &self.archiver).await?;
        let extraction = run_extract_stage(candidate, &self.event_tx, &self.archiver).await?;

        let cleanup = match run_cleanup_stage(&candidate.dir, &self.event_tx, &self.config.retention)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                warn!(dir = ?candidate.dir, error = %e, "cleanup did not run");
                CleanupReport::default()
            }
        };

        Ok(ArchiveReport {
            verification,
            test,
            extraction,
            cleanup,
        })
    }
}
