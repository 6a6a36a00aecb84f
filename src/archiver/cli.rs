//! 7-Zip archiver using the external `7z` binary

use super::parser::{
    ExitStatus, PROBE_MARKER, parse_extract_output, parse_probe_output, parse_test_output,
};
use super::traits::{Archiver, ExtractReport, TestReport};
use crate::config::ToolsConfig;
use crate::error::Error;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Binary names tried on PATH, in order (p7zip, standalone, 7-Zip for Linux/macOS)
pub const SEVENZIP_BINARIES: &[&str] = &["7z", "7za", "7zz"];

/// Archiver backed by the external `7z` binary
///
/// # Examples
///
/// ```no_run
/// use rarcursed::archiver::SevenZipCli;
/// use std::path::PathBuf;
///
/// // Explicit path
/// let archiver = SevenZipCli::new(PathBuf::from("/usr/bin/7z"));
///
/// // Or auto-discover from PATH
/// let archiver = SevenZipCli::from_path().expect("7z not found in PATH");
/// ```
pub struct SevenZipCli {
    binary_path: PathBuf,
}

impl SevenZipCli {
    /// Create an archiver with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Search PATH for any of [`SEVENZIP_BINARIES`]
    pub fn from_path() -> Option<Self> {
        SEVENZIP_BINARIES
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(Self::new)
    }

    /// Resolve the binary from configuration: explicit path first, then PATH if allowed
    pub fn from_config(tools: &ToolsConfig) -> crate::Result<Self> {
        if let Some(path) = &tools.sevenzip_path {
            return Ok(Self::new(path.clone()));
        }

        if tools.search_path
            && let Some(archiver) = Self::from_path()
        {
            return Ok(archiver);
        }

        Err(Error::ToolNotFound {
            tool: PROBE_MARKER.to_string(),
            searched: if tools.search_path {
                format!("PATH for {}", SEVENZIP_BINARIES.join(", "))
            } else {
                "nothing (PATH search disabled and no sevenzip_path set)".to_string()
            },
        })
    }

    /// Path of the binary this archiver runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        Error::ExternalTool(format!(
            "failed to execute {}: {}",
            self.binary_path.display(),
            e
        ))
    }
}

/// `-o<dir>` without forcing the destination through UTF-8
fn output_dir_arg(destination: &Path) -> OsString {
    let mut arg = OsString::from("-o");
    arg.push(destination.as_os_str());
    arg
}

#[async_trait]
impl Archiver for SevenZipCli {
    async fn probe(&self) -> crate::Result<String> {
        // 7z with no arguments prints its banner and usage
        let output = Command::new(&self.binary_path).output().await.map_err(|e| {
            Error::ToolNotFound {
                tool: PROBE_MARKER.to_string(),
                searched: format!("{} ({})", self.binary_path.display(), e),
            }
        })?;

        parse_probe_output(&output.stdout, &output.stderr).ok_or_else(|| Error::ToolNotFound {
            tool: PROBE_MARKER.to_string(),
            searched: format!(
                "{} (did not identify as {})",
                self.binary_path.display(),
                PROBE_MARKER
            ),
        })
    }

    async fn test(&self, archive: &Path) -> crate::Result<TestReport> {
        debug!(binary = ?self.binary_path, ?archive, "running 7z test");
        let output = Command::new(&self.binary_path)
            .arg("t") // Test
            .arg(archive)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        Ok(parse_test_output(
            &output.stdout,
            &output.stderr,
            ExitStatus::from(output.status),
        ))
    }

    async fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        overwrite: bool,
    ) -> crate::Result<ExtractReport> {
        debug!(binary = ?self.binary_path, ?archive, ?destination, overwrite, "running 7z extract");
        let output = Command::new(&self.binary_path)
            .arg("x") // Extract with full paths
            .arg(archive)
            .arg(output_dir_arg(destination))
            .arg(if overwrite { "-aoa" } else { "-aos" })
            .arg("-y") // Assume yes on every query
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        Ok(parse_extract_output(
            &output.stdout,
            &output.stderr,
            ExitStatus::from(output.status),
        ))
    }

    fn name(&self) -> &'static str {
        "cli-7z"
    }
}
