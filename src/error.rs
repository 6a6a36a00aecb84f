//! Error types for rarcursed
//!
//! Two layers:
//! - [`Error`] for failures that surface to the caller (missing archiver, bad config, I/O)
//! - [`PipelineError`] for the reason a single candidate was abandoned. These never abort a
//!   scan; the scanner logs them and moves on to the next candidate.
//!
//! Cleanup has no error variant: deletion failures are counted in the cleanup report and
//! logged, never propagated.

use crate::types::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rarcursed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rarcursed
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "scan.archive_extensions")
        key: Option<String>,
    },

    /// Per-candidate pipeline failure (checksum, integrity test or extraction)
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The external archiver could not be located or did not identify itself
    #[error("{tool} not found (searched: {searched})")]
    ToolNotFound {
        /// Human-readable name of the tool ("7-Zip")
        tool: String,
        /// Where we looked (explicit path or binary names tried on PATH)
        searched: String,
    },

    /// External tool execution failed (spawn error, unreadable output)
    #[error("external tool error: {0}")]
    ExternalTool(String),
}

/// Why a candidate archive was skipped
#[derive(Debug, Error)]
pub enum PipelineError {
    /// One or more manifest records did not match, or a manifest was unreadable
    #[error("checksum verification failed for {archive}: {mismatches:?}")]
    ChecksumMismatch {
        /// The candidate archive
        archive: PathBuf,
        /// File names (or manifest paths) that failed
        mismatches: Vec<String>,
    },

    /// The archiver's test operation reported a CRC-class failure
    #[error("integrity test failed for {archive}: {reason}")]
    IntegrityFailed {
        /// The candidate archive
        archive: PathBuf,
        /// What the archiver said
        reason: String,
    },

    /// The archiver reported a fatal extraction error
    #[error("extraction failed for {archive}: {reason}")]
    ExtractionFailed {
        /// The candidate archive
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },
}

impl PipelineError {
    /// The stage that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::ChecksumMismatch { .. } => Stage::Verify,
            PipelineError::IntegrityFailed { .. } => Stage::Test,
            PipelineError::ExtractionFailed { .. } => Stage::Extract,
        }
    }

    /// The archive this error is about
    pub fn archive(&self) -> &std::path::Path {
        match self {
            PipelineError::ChecksumMismatch { archive, .. }
            | PipelineError::IntegrityFailed { archive, .. }
            | PipelineError::ExtractionFailed { archive, .. } => archive,
        }
    }
}

impl Error {
    /// Machine-readable error code, used in log lines and the process exit path
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Pipeline(PipelineError::ChecksumMismatch { .. }) => "checksum_mismatch",
            Error::Pipeline(PipelineError::IntegrityFailed { .. }) => "integrity_failed",
            Error::Pipeline(PipelineError::ExtractionFailed { .. }) => "extraction_failed",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ToolNotFound { .. } => "tool_not_found",
            Error::ExternalTool(_) => "external_tool_error",
        }
    }

    /// Whether this error must stop the whole run instead of a single candidate
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::ToolNotFound { .. } | Error::Serialization(_)
        )
    }
}
