use clap::Parser;
use rarcursed::config::normalize_extension;
use rarcursed::{Config, Event, ScanSummary, Scanner, SevenZipCli, run_with_shutdown};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Exit status used when a signal ended the scan early
const INTERRUPTED_EXIT_CODE: u8 = 130;

#[derive(Parser)]
#[command(name = "rarcursed")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify, extract and prune archive sets across a directory tree")]
struct Cli {
    /// Directory to scan recursively (default: current directory)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Files larger than this many bytes are always kept
    #[arg(long, value_name = "BYTES")]
    min: Option<u64>,

    /// Dry run: report what would be deleted, delete nothing
    #[arg(long)]
    test: bool,

    /// Extra extensions to remove, comma separated (accepted, not applied)
    #[arg(long, value_delimiter = ',', value_name = "EXT,...")]
    rem: Vec<String>,

    /// Path to the 7z executable (default: search PATH)
    #[arg(long, value_name = "PATH")]
    sevenzip: Option<PathBuf>,

    /// JSON configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Load the configuration file (or defaults) and overlay the flags that were given
    fn into_config(self) -> rarcursed::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };

        if let Some(dir) = self.dir {
            config.scan.root_dir = dir;
        }
        if let Some(min) = self.min {
            config.retention.min_size_bytes = min;
        }
        if self.test {
            config.retention.dry_run = true;
        }
        let rem: Vec<String> = self
            .rem
            .iter()
            .map(|ext| normalize_extension(ext))
            .filter(|ext| !ext.is_empty())
            .collect();
        if !rem.is_empty() {
            config.retention.extra_remove_extensions = rem;
        }
        if let Some(path) = self.sevenzip {
            config.tools.sevenzip_path = Some(path);
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(quiet: bool) {
    let default_filter = if quiet { "rarcursed=warn" } else { "rarcursed=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .init();
}

/// Print one line per finished or abandoned archive
async fn print_events(mut events: broadcast::Receiver<Event>, quiet: bool) {
    loop {
        match events.recv().await {
            Ok(Event::ScanStarted { root }) => {
                println!("Scanning directory: {}", root.display());
            }
            Ok(Event::Processed { path, warnings }) if !quiet => {
                if warnings {
                    println!("Processed {} (with warnings)", path.display());
                } else {
                    println!("Processed {}", path.display());
                }
            }
            Ok(Event::Skipped {
                path,
                stage,
                reason,
            }) => {
                println!("Skipped {} ({} failed: {})", path.display(), stage, reason);
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::debug!(missed, "event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_summary(summary: &ScanSummary) {
    if summary.nothing_found() {
        println!("No archives found.");
    } else {
        println!(
            "{} of {} archive(s) processed.",
            summary.processed, summary.candidates
        );
    }
    if summary.with_warnings > 0 {
        println!(
            "{} archive(s) extracted with warnings.",
            summary.with_warnings
        );
    }
    if summary.interrupted {
        println!("Scan interrupted before every archive was visited.");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let quiet = cli.quiet;
    init_tracing(quiet);

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let archiver = match SevenZipCli::from_config(&config.tools) {
        Ok(archiver) => archiver,
        Err(e) => {
            tracing::error!(code = e.error_code(), error = %e, "no usable archiver");
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(binary = ?archiver.binary_path(), "using 7z");

    let scanner = Scanner::new(Arc::new(config), Arc::new(archiver));
    let printer = tokio::spawn(print_events(scanner.subscribe(), quiet));

    let result = run_with_shutdown(&scanner).await;

    // dropping the scanner closes the channel so the printer drains and exits
    drop(scanner);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "event printer task failed");
    }

    match result {
        Ok(summary) => {
            print_summary(&summary);
            if summary.interrupted {
                ExitCode::from(INTERRUPTED_EXIT_CODE)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            tracing::error!(code = e.error_code(), error = %e, "scan aborted");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
