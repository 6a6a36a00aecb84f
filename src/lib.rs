//! # rarcursed
//!
//! Find, verify, extract and prune archive sets across a directory tree.
//!
//! ## Design Philosophy
//!
//! rarcursed is designed to be:
//! - **Conservative** - Nothing is deleted unless the archive verified, tested and extracted
//! - **Sequential** - One archive at a time, stages strictly in order
//! - **Library-first** - The binary is a thin wrapper over [`Scanner`]
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! Every candidate goes through the same [`Pipeline`]: SFV verification, an integrity
//! test by the external archiver, extraction next to the archive, then a retention pass
//! that deletes everything neither whitelisted nor large.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rarcursed::{Config, Scanner, SevenZipCli};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.scan.root_dir = "/media/incoming".into();
//!     config.retention.dry_run = true;
//!
//!     let archiver = Arc::new(SevenZipCli::from_config(&config.tools)?);
//!     let scanner = Scanner::new(Arc::new(config), archiver);
//!
//!     // Subscribe to events
//!     let mut events = scanner.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = scanner.run().await?;
//!     println!("{} archive(s) processed", summary.processed);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// External archiver integration
pub mod archiver;
/// SFV checksum verification
pub mod checksum;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Per-candidate processing pipeline
pub mod pipeline;
/// Directory walk and candidate selection
pub mod scanner;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use archiver::{Archiver, ExtractReport, ScriptedArchiver, SevenZipCli, TestReport};
pub use checksum::VerificationResult;
pub use config::{ChecksumConfig, Config, RetentionConfig, ScanConfig, ToolsConfig};
pub use error::{Error, PipelineError, Result};
pub use pipeline::{ArchiveReport, CleanupReport, Pipeline, RetentionDecision};
pub use scanner::Scanner;
pub use types::{Candidate, Event, ScanSummary, Stage};

/// Run a scan, stopping early on a termination signal.
///
/// The first signal lets the archive in flight finish every stage, then ends the walk;
/// the summary comes back with `interrupted` set.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use rarcursed::{Config, Scanner, SevenZipCli, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let archiver = Arc::new(SevenZipCli::from_config(&config.tools)?);
///     let scanner = Scanner::new(Arc::new(config), archiver);
///
///     let summary = run_with_shutdown(&scanner).await?;
///     if summary.interrupted {
///         println!("stopped early");
///     }
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(scanner: &Scanner) -> Result<ScanSummary> {
    let scan = scanner.run();
    tokio::pin!(scan);

    tokio::select! {
        result = &mut scan => return result,
        _ = wait_for_signal() => {
            tracing::warn!("stop requested, finishing current archive");
            scanner.request_stop();
        }
    }

    scan.await
}

/// Resolves on the first termination signal. Never resolves if no signal can be observed.
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                _ = sigint.recv() => tracing::info!("received SIGINT"),
            }
        }
        (Ok(mut only), Err(e)) | (Err(e), Ok(mut only)) => {
            tracing::warn!(error = %e, "signal handler registration failed, listening for one signal only");
            only.recv().await;
            tracing::info!("received termination signal");
        }
        (Err(e), Err(_)) => {
            tracing::warn!(error = %e, "no signal handlers registered, falling back to ctrl_c");
            wait_for_ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl+C, scan cannot be interrupted");
            std::future::pending::<()>().await;
        }
    }
}
