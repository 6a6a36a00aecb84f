//! Traits and types for the external archiver

use async_trait::async_trait;
use std::path::Path;

/// Result of an archive integrity test
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    /// Whether the archive passed (no CRC-class failure reported)
    pub passed: bool,
    /// Process exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Lines from the tool's output that explain the verdict
    pub diagnostic: String,
}

/// Result of an extraction
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    /// Whether extraction completed (possibly with non-fatal warnings)
    pub success: bool,
    /// Process exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
    /// The tool exited non-zero but the status is not fatal
    pub warnings: bool,
    /// Lines from the tool's output that explain the verdict
    pub diagnostic: String,
}

/// Capability interface over an external archiving tool
///
/// The pipeline only ever asks an archiver to test or extract a path. Implementations
/// run a real binary ([`SevenZipCli`](super::SevenZipCli)) or return scripted outcomes in
/// tests.
///
/// # Examples
///
/// ```no_run
/// use rarcursed::archiver::{Archiver, SevenZipCli};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let archiver = SevenZipCli::from_path().expect("7z not found in PATH");
/// println!("using {}", archiver.probe().await?);
///
/// let report = archiver.test(Path::new("/media/movie.part01.rar")).await?;
/// if report.passed {
///     let extracted = archiver
///         .extract(Path::new("/media/movie.part01.rar"), Path::new("/media"), true)
///         .await?;
///     println!("extracted: {}", extracted.success);
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Confirm the tool is installed and return its identifying banner line
    ///
    /// # Errors
    ///
    /// `Error::ToolNotFound` if the tool cannot be run or does not identify itself.
    async fn probe(&self) -> crate::Result<String>;

    /// Run the tool's integrity test on an archive
    ///
    /// # Errors
    ///
    /// Returns an error only if the tool could not be launched. A corrupt archive is a
    /// successful call with `passed == false`.
    async fn test(&self, archive: &Path) -> crate::Result<TestReport>;

    /// Extract an archive into `destination`
    ///
    /// # Errors
    ///
    /// Returns an error only if the tool could not be launched.
    async fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        overwrite: bool,
    ) -> crate::Result<ExtractReport>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
