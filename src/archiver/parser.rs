//! Classification of 7-Zip output
//!
//! 7-Zip is lenient about exit codes: it warns and exits non-zero on archives that test
//! and extract fine, and only a handful of conditions are really fatal. The text it
//! prints is the primary signal for integrity tests; the exit code is the signal for
//! extraction.

use super::traits::{ExtractReport, TestReport};

/// Substring 7-Zip prints for checksum failures ("CRC Failed", "CRC Failed in encrypted
/// file. Wrong password?")
pub const CRC_FAILURE_MARKER: &str = "CRC";

/// 7-Zip's "fatal error" exit code (missing volume, unreadable archive)
pub const FATAL_EXIT_CODE: i32 = 2;

/// Text 7-Zip prints in its banner
pub const PROBE_MARKER: &str = "7-Zip";

/// Exit status of an external command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The command exited with this code
    Code(i32),
    /// The command was terminated by a signal and has no exit code
    Terminated,
}

impl ExitStatus {
    /// Returns `true` if the command exited with code 0
    pub fn is_success(self) -> bool {
        matches!(self, Self::Code(0))
    }

    /// The exit code, if any
    pub fn code(self) -> Option<i32> {
        match self {
            Self::Code(code) => Some(code),
            Self::Terminated => None,
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        match status.code() {
            Some(code) => Self::Code(code),
            None => Self::Terminated,
        }
    }
}

impl From<Option<i32>> for ExitStatus {
    fn from(code: Option<i32>) -> Self {
        code.map_or(Self::Terminated, Self::Code)
    }
}

/// Lines where 7-Zip repeats the archive path back; a path may itself contain "CRC"
const PATH_ECHO_PREFIXES: &[&str] = &["Testing archive:", "Path =", "Listing archive:"];

fn is_path_echo(line: &str) -> bool {
    PATH_ECHO_PREFIXES
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

/// Classify the output of `7z t`
///
/// The archive fails if either stream mentions [`CRC_FAILURE_MARKER`] outside the lines
/// that echo the archive path. Any other non-zero exit is treated as a warning and the
/// archive passes.
pub fn parse_test_output(stdout: &[u8], stderr: &[u8], exit_status: ExitStatus) -> TestReport {
    let output = String::from_utf8_lossy(stdout);
    let error_output = String::from_utf8_lossy(stderr);

    let crc_lines: Vec<&str> = output
        .lines()
        .chain(error_output.lines())
        .map(str::trim)
        .filter(|line| !is_path_echo(line) && line.contains(CRC_FAILURE_MARKER))
        .collect();

    let passed = crc_lines.is_empty();
    let diagnostic = if passed {
        summary_line(&output, &error_output)
    } else {
        crc_lines.join("\n")
    };

    TestReport {
        passed,
        exit_code: exit_status.code(),
        diagnostic,
    }
}

/// Classify the output of `7z x`
///
/// Only [`FATAL_EXIT_CODE`] (or termination by a signal) is a failure. Other non-zero
/// codes mean 7-Zip finished with warnings.
pub fn parse_extract_output(
    stdout: &[u8],
    stderr: &[u8],
    exit_status: ExitStatus,
) -> ExtractReport {
    let output = String::from_utf8_lossy(stdout);
    let error_output = String::from_utf8_lossy(stderr);

    let success = match exit_status {
        ExitStatus::Code(FATAL_EXIT_CODE) | ExitStatus::Terminated => false,
        ExitStatus::Code(_) => true,
    };

    ExtractReport {
        success,
        exit_code: exit_status.code(),
        warnings: success && !exit_status.is_success(),
        diagnostic: summary_line(&output, &error_output),
    }
}

/// Return the banner line if the output identifies 7-Zip
pub fn parse_probe_output(stdout: &[u8], stderr: &[u8]) -> Option<String> {
    let output = String::from_utf8_lossy(stdout);
    let error_output = String::from_utf8_lossy(stderr);

    output
        .lines()
        .chain(error_output.lines())
        .find(|line| line.contains(PROBE_MARKER))
        .map(|line| line.trim().to_string())
}

/// Best single line to show for a run: the first "ERROR"/"Error" line on either stream,
/// otherwise the last non-empty line of stdout
fn summary_line(output: &str, error_output: &str) -> String {
    let error_line = error_output
        .lines()
        .chain(output.lines())
        .find(|line| line.contains("ERROR") || line.contains("Error"));

    error_line
        .or_else(|| output.lines().rev().find(|line| !line.trim().is_empty()))
        .map(|line| line.trim().to_string())
        .unwrap_or_default()
}
