//! Configuration types for rarcursed

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory scan configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Root directory to scan recursively (default: ".")
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// File extensions to treat as archives, without the dot (default: rar, zip, 7z)
    #[serde(default = "default_archive_extensions")]
    pub archive_extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            archive_extensions: default_archive_extensions(),
        }
    }
}

/// Checksum manifest configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChecksumConfig {
    /// Extension of checksum manifests, without the dot (default: "sfv")
    #[serde(default = "default_manifest_extension")]
    pub manifest_extension: String,
}

impl Default for ChecksumConfig {
    fn default() -> Self {
        Self {
            manifest_extension: default_manifest_extension(),
        }
    }
}

/// Post-extraction retention policy
///
/// A file survives cleanup if its extension is in `keep_extensions` or it is larger than
/// `min_size_bytes`. Everything else in the extraction directory is deleted unless
/// `dry_run` is set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Files strictly larger than this are always kept (default: 200 MB)
    #[serde(default = "default_min_size_bytes")]
    pub min_size_bytes: u64,

    /// Extensions that are always kept, without the dot (video containers and DVD files)
    #[serde(default = "default_keep_extensions")]
    pub keep_extensions: Vec<String>,

    /// Extra extensions to remove (.nfo, .sfv, ...). Accepted but not applied by the
    /// retention decision; see [`RetentionConfig::extra_removals_requested`].
    #[serde(default)]
    pub extra_remove_extensions: Vec<String>,

    /// Report what would be deleted without deleting anything (default: false)
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: default_min_size_bytes(),
            keep_extensions: default_keep_extensions(),
            extra_remove_extensions: Vec::new(),
            dry_run: false,
        }
    }
}

impl RetentionConfig {
    /// Whether the user asked for extra removals that the retention policy ignores
    pub fn extra_removals_requested(&self) -> bool {
        self.extra_remove_extensions.iter().any(|e| !e.trim().is_empty())
    }
}

/// External tool configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the 7z executable (auto-detected if None)
    #[serde(default)]
    pub sevenzip_path: Option<PathBuf>,

    /// Whether to search PATH for 7z if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            sevenzip_path: None,
            search_path: true,
        }
    }
}

/// Main configuration
///
/// Owned by the caller (the CLI or an embedding application) and handed to every
/// component as a plain value; nothing in the crate keeps process-wide settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory walk settings
    #[serde(default)]
    pub scan: ScanConfig,

    /// Manifest lookup settings
    #[serde(default)]
    pub checksum: ChecksumConfig,

    /// Cleanup policy
    #[serde(default)]
    pub retention: RetentionConfig,

    /// External archiver discovery
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self
            .scan
            .archive_extensions
            .iter()
            .all(|e| normalize_extension(e).is_empty())
        {
            return Err(Error::Config {
                message: "at least one archive extension is required".into(),
                key: Some("scan.archive_extensions".into()),
            });
        }

        if normalize_extension(&self.checksum.manifest_extension).is_empty() {
            return Err(Error::Config {
                message: "manifest extension must not be empty".into(),
                key: Some("checksum.manifest_extension".into()),
            });
        }

        Ok(())
    }
}

/// Lowercase an extension and drop a leading dot, so ".MKV" and "mkv" compare equal
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Check a path's extension against a configured list (case-insensitive, dot optional)
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => extensions
            .iter()
            .any(|candidate| normalize_extension(candidate).eq_ignore_ascii_case(ext)),
        None => false,
    }
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_archive_extensions() -> Vec<String> {
    vec!["rar".into(), "zip".into(), "7z".into()]
}

fn default_manifest_extension() -> String {
    "sfv".into()
}

fn default_min_size_bytes() -> u64 {
    200_000_000
}

fn default_keep_extensions() -> Vec<String> {
    vec![
        "mkv".into(),
        "mp4".into(),
        "avi".into(),
        "bup".into(),
        "ifo".into(),
        "vob".into(),
    ]
}

fn default_true() -> bool {
    true
}
