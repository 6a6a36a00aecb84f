//! Scripted archiver returning canned outcomes

use super::traits::{Archiver, ExtractReport, TestReport};
use crate::error::Error;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A call received by a [`ScriptedArchiver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiverCall {
    /// `test(archive)`
    Test(PathBuf),
    /// `extract(archive, destination, overwrite)`
    Extract(PathBuf, PathBuf, bool),
}

/// Archiver that never runs a process
///
/// Every archive passes its test and extracts cleanly unless its file name was marked
/// with [`fail_test_for`](Self::fail_test_for) or
/// [`fail_extract_for`](Self::fail_extract_for). Names marked with
/// [`warn_extract_for`](Self::warn_extract_for) extract with a non-fatal exit code. A
/// successful extract writes the
/// configured payload files into the destination so cleanup has something to prune.
///
/// # Examples
///
/// ```
/// use rarcursed::archiver::{Archiver, ScriptedArchiver};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let archiver = ScriptedArchiver::new().fail_test_for("broken.rar");
///
/// assert!(archiver.test(Path::new("/dl/good.rar")).await?.passed);
/// assert!(!archiver.test(Path::new("/dl/broken.rar")).await?.passed);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ScriptedArchiver {
    failing_tests: HashSet<String>,
    failing_extracts: HashSet<String>,
    warning_extracts: HashSet<String>,
    payload: Vec<(String, u64)>,
    unavailable: bool,
    calls: Mutex<Vec<ArchiverCall>>,
}

impl ScriptedArchiver {
    /// Archiver where everything passes and extraction writes nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a CRC failure when testing an archive with this file name
    pub fn fail_test_for(mut self, file_name: &str) -> Self {
        self.failing_tests.insert(file_name.to_string());
        self
    }

    /// Report the fatal exit code when extracting an archive with this file name
    pub fn fail_extract_for(mut self, file_name: &str) -> Self {
        self.failing_extracts.insert(file_name.to_string());
        self
    }

    /// Extract an archive with this file name but exit with a warning code
    pub fn warn_extract_for(mut self, file_name: &str) -> Self {
        self.warning_extracts.insert(file_name.to_string());
        self
    }

    /// Write a file of `size` bytes (sparse) into the destination on every successful
    /// extract
    pub fn with_payload(mut self, file_name: &str, size: u64) -> Self {
        self.payload.push((file_name.to_string(), size));
        self
    }

    /// Behave like a binary that cannot be launched
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<ArchiverCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: ArchiverCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn launch_check(&self) -> crate::Result<()> {
        if self.unavailable {
            return Err(Error::ExternalTool(
                "failed to execute scripted archiver: unavailable".into(),
            ));
        }
        Ok(())
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl Archiver for ScriptedArchiver {
    async fn probe(&self) -> crate::Result<String> {
        if self.unavailable {
            return Err(Error::ToolNotFound {
                tool: "7-Zip".into(),
                searched: "scripted archiver (unavailable)".into(),
            });
        }
        Ok("7-Zip (scripted)".into())
    }

    async fn test(&self, archive: &Path) -> crate::Result<TestReport> {
        self.record(ArchiverCall::Test(archive.to_path_buf()));
        self.launch_check()?;

        let passed = !self.failing_tests.contains(&file_name_of(archive));
        Ok(TestReport {
            passed,
            exit_code: Some(if passed { 0 } else { 2 }),
            diagnostic: if passed {
                "Everything is Ok".into()
            } else {
                format!("ERROR: CRC Failed : {}", file_name_of(archive))
            },
        })
    }

    async fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        overwrite: bool,
    ) -> crate::Result<ExtractReport> {
        self.record(ArchiverCall::Extract(
            archive.to_path_buf(),
            destination.to_path_buf(),
            overwrite,
        ));
        self.launch_check()?;

        if self.failing_extracts.contains(&file_name_of(archive)) {
            return Ok(ExtractReport {
                success: false,
                exit_code: Some(super::FATAL_EXIT_CODE),
                warnings: false,
                diagnostic: "ERROR: Missing volume".into(),
            });
        }

        for (name, size) in &self.payload {
            let file = tokio::fs::File::create(destination.join(name)).await?;
            file.set_len(*size).await?;
        }

        if self.warning_extracts.contains(&file_name_of(archive)) {
            return Ok(ExtractReport {
                success: true,
                exit_code: Some(1),
                warnings: true,
                diagnostic: "WARNING: There are data after the end of archive".into(),
            });
        }

        Ok(ExtractReport {
            success: true,
            exit_code: Some(0),
            warnings: false,
            diagnostic: "Everything is Ok".into(),
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
