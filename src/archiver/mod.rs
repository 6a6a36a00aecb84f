//! External archiver integration
//!
//! The crate never decompresses anything itself. Integrity tests and extraction are
//! delegated to an external tool behind the [`Archiver`] trait:
//!
//! - [`SevenZipCli`]: runs the `7z` binary (`7z t`, `7z x`)
//! - [`ScriptedArchiver`]: canned outcomes, no process; used to rehearse a scan and in
//!   tests
//! - output classification lives in one place, [`parse_test_output`] and
//!   [`parse_extract_output`], so a change in the tool's wording has a single point of
//!   change

mod cli;
mod parser;
mod scripted;
mod traits;

pub use cli::{SEVENZIP_BINARIES, SevenZipCli};
pub use parser::{
    CRC_FAILURE_MARKER, ExitStatus, FATAL_EXIT_CODE, PROBE_MARKER, parse_extract_output,
    parse_probe_output, parse_test_output,
};
pub use scripted::{ArchiverCall, ScriptedArchiver};
pub use traits::{Archiver, ExtractReport, TestReport};
