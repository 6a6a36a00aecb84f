//! Archive integrity test stage

use crate::archiver::{Archiver, TestReport};
use crate::error::{PipelineError, Result};
use crate::types::{Candidate, Event};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Execute the integrity test stage
///
/// A launch failure is a failed test: nothing about the archive has been proven.
pub(crate) async fn run_test_stage(
    candidate: &Candidate,
    event_tx: &broadcast::Sender<Event>,
    archiver: &Arc<dyn Archiver>,
) -> Result<TestReport> {
    debug!(archive = ?candidate.path, archiver = archiver.name(), "running test stage");

    event_tx
        .send(Event::Testing {
            path: candidate.path.clone(),
        })
        .ok();

    let report = match archiver.test(&candidate.path).await {
        Ok(report) => report,
        Err(e) => {
            warn!(archive = ?candidate.path, error = %e, "integrity test could not run");
            return Err(PipelineError::IntegrityFailed {
                archive: candidate.path.clone(),
                reason: e.to_string(),
            }
            .into());
        }
    };

    if !report.passed {
        warn!(
            archive = ?candidate.path,
            exit_code = ?report.exit_code,
            diagnostic = %report.diagnostic,
            "integrity test failed"
        );
        return Err(PipelineError::IntegrityFailed {
            archive: candidate.path.clone(),
            reason: report.diagnostic,
        }
        .into());
    }

    info!(archive = ?candidate.path, exit_code = ?report.exit_code, "integrity test passed");
    Ok(report)
}
