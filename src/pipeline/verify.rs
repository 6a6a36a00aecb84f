//! SFV verification stage

use crate::checksum::{VerificationResult, verify_directory};
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::types::{Candidate, Event};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Execute the verify stage
///
/// Fails the candidate if any manifest next to it disagrees with the files on disk.
pub(crate) async fn run_verify_stage(
    candidate: &Candidate,
    event_tx: &broadcast::Sender<Event>,
    config: &Config,
) -> Result<VerificationResult> {
    debug!(archive = ?candidate.path, "running verify stage");

    event_tx
        .send(Event::Verifying {
            path: candidate.path.clone(),
        })
        .ok();

    let result = verify_directory(&candidate.dir, &config.checksum.manifest_extension).await;

    event_tx
        .send(Event::VerifyComplete {
            path: candidate.path.clone(),
            passed: result.passed,
            records: result.records_checked,
        })
        .ok();

    if !result.passed {
        warn!(
            archive = ?candidate.path,
            mismatches = ?result.mismatches,
            "checksum verification failed"
        );
        return Err(PipelineError::ChecksumMismatch {
            archive: candidate.path.clone(),
            mismatches: result.mismatches,
        }
        .into());
    }

    Ok(result)
}
