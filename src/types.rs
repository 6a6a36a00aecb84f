//! Core types and events

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A primary archive volume selected for processing
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Candidate {
    /// Absolute path to the archive (first volume for multi-part sets)
    pub path: PathBuf,
    /// Directory holding the archive; extraction and cleanup happen here
    pub dir: PathBuf,
    /// Matched archive extension, lowercase, without the dot
    pub extension: String,
}

impl Candidate {
    /// Build a candidate from an archive path. Returns `None` for paths without a parent
    /// directory or without a UTF-8 extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let dir = path.parent()?.to_path_buf();
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        Some(Self {
            path: path.to_path_buf(),
            dir,
            extension,
        })
    }

    /// File name for log lines
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Pipeline stage that can stop a candidate. Cleanup is best-effort and never does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// SFV checksum verification
    Verify,
    /// Archiver integrity test
    Test,
    /// Archive extraction
    Extract,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Verify => "verify",
            Stage::Test => "test",
            Stage::Extract => "extract",
        };
        f.write_str(name)
    }
}

/// Event emitted while a scan progresses
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Scan started
    ScanStarted {
        /// Root directory being walked
        root: PathBuf,
    },

    /// A primary archive volume was selected
    CandidateFound {
        /// Archive path
        path: PathBuf,
    },

    /// Checksum manifests are being checked
    Verifying {
        /// Archive path
        path: PathBuf,
    },

    /// Checksum verification finished
    VerifyComplete {
        /// Archive path
        path: PathBuf,
        /// Whether every record matched
        passed: bool,
        /// Number of manifest records checked
        records: usize,
    },

    /// Archiver integrity test is running
    Testing {
        /// Archive path
        path: PathBuf,
    },

    /// Archive is being extracted
    Extracting {
        /// Archive path
        path: PathBuf,
        /// Extraction destination
        destination: PathBuf,
    },

    /// Extraction directory is being pruned
    Cleaning {
        /// Directory being cleaned
        dir: PathBuf,
    },

    /// Cleanup finished
    CleanupComplete {
        /// Directory that was cleaned
        dir: PathBuf,
        /// Files removed
        deleted: usize,
        /// Files kept
        kept: usize,
    },

    /// Candidate went through every stage
    Processed {
        /// Archive path
        path: PathBuf,
        /// The archiver exited non-zero without a fatal error
        warnings: bool,
    },

    /// Candidate was abandoned at a stage
    Skipped {
        /// Archive path
        path: PathBuf,
        /// Stage that failed
        stage: Stage,
        /// Why it failed
        reason: String,
    },

    /// Scan finished
    ScanComplete {
        /// Candidates selected
        candidates: usize,
        /// Candidates processed successfully
        processed: usize,
    },
}

/// Outcome of a full scan
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Primary volumes selected during the walk
    pub candidates: usize,
    /// Candidates that completed every stage
    pub processed: usize,
    /// Processed candidates whose extraction exited with a non-fatal warning
    pub with_warnings: usize,
    /// Candidates abandoned, with the stage that stopped them
    pub skipped: Vec<(PathBuf, Stage)>,
    /// Walk errors that were logged and stepped over
    pub walk_errors: usize,
    /// A stop was requested before every candidate was visited
    pub interrupted: bool,
}

impl ScanSummary {
    /// Nothing was selected for processing
    pub fn nothing_found(&self) -> bool {
        self.candidates == 0
    }
}
