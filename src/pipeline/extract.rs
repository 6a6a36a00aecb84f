//! Extraction stage

use crate::archiver::{Archiver, ExtractReport};
use crate::error::{PipelineError, Result};
use crate::types::{Candidate, Event};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Execute the extraction stage
///
/// Extracts next to the archive, overwriting existing files. On failure nothing is
/// cleaned: an incomplete extraction must not cost the source volumes.
pub(crate) async fn run_extract_stage(
    candidate: &Candidate,
    event_tx: &broadcast::Sender<Event>,
    archiver: &Arc<dyn Archiver>,
) -> Result<ExtractReport> {
    let destination = &candidate.dir;
    debug!(archive = ?candidate.path, ?destination, "running extract stage");

    event_tx
        .send(Event::Extracting {
            path: candidate.path.clone(),
            destination: destination.clone(),
        })
        .ok();

    let report = match archiver.extract(&candidate.path, destination, true).await {
        Ok(report) => report,
        Err(e) => {
            warn!(archive = ?candidate.path, error = %e, "extraction could not run");
            return Err(PipelineError::ExtractionFailed {
                archive: candidate.path.clone(),
                reason: e.to_string(),
            }
            .into());
        }
    };

    if !report.success {
        warn!(
            archive = ?candidate.path,
            exit_code = ?report.exit_code,
            diagnostic = %report.diagnostic,
            "extraction failed"
        );
        let reason = match report.exit_code {
            Some(code) => format!("exit code {}: {}", code, report.diagnostic),
            None => format!("terminated by signal: {}", report.diagnostic),
        };
        return Err(PipelineError::ExtractionFailed {
            archive: candidate.path.clone(),
            reason,
        }
        .into());
    }

    if report.warnings {
        info!(
            archive = ?candidate.path,
            exit_code = ?report.exit_code,
            diagnostic = %report.diagnostic,
            "extraction complete with warnings"
        );
    } else {
        info!(archive = ?candidate.path, ?destination, "extraction complete");
    }

    Ok(report)
}
