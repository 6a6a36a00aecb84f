//! SFV checksum verification
//!
//! Before an archive is touched, every `.sfv` manifest next to it is checked: each listed
//! file is hashed with CRC-32 (IEEE) and compared against the manifest. A directory without
//! a manifest passes.

mod manifest;


pub use manifest::{
    ChecksumRecord, checksum_matches, format_crc32, normalize_checksum, parse_manifest,
};

use crate::config::has_extension;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

const READ_CHUNK: usize = 64 * 1024;

/// Result of checking every manifest in a directory
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationResult {
    /// Whether every record in every manifest matched
    pub passed: bool,
    /// Files whose checksum did not match or could not be computed, plus unreadable
    /// manifests
    pub mismatches: Vec<String>,
    /// Manifests that were found
    pub manifests: Vec<PathBuf>,
    /// Number of records compared
    pub records_checked: usize,
}

/// Compute the CRC-32 (IEEE) of a file's full contents
pub async fn crc32_file(path: &Path) -> std::io::Result<u32> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize())
}

/// Find manifests directly inside `dir` (not recursive), sorted by path
pub async fn find_manifests(
    dir: &Path,
    manifest_extension: &str,
) -> std::io::Result<Vec<PathBuf>> {
    let extensions = [manifest_extension.to_string()];
    let mut manifests = Vec::new();

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        // follows symlinks; dangling links are not manifests
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if is_file && has_extension(&path, &extensions) {
            manifests.push(path);
        }
    }

    manifests.sort();
    Ok(manifests)
}

/// Verify every manifest in `dir`
///
/// Unreadable referenced files count as mismatches without stopping the walk. An
/// unreadable manifest (or directory) fails the whole verification.
pub async fn verify_directory(dir: &Path, manifest_extension: &str) -> VerificationResult {
    let mut result = VerificationResult {
        passed: true,
        ..Default::default()
    };

    let manifests = match find_manifests(dir, manifest_extension).await {
        Ok(manifests) => manifests,
        Err(e) => {
            warn!(?dir, error = %e, "failed to list directory for checksum manifests");
            result.passed = false;
            result.mismatches.push(dir.display().to_string());
            return result;
        }
    };

    if manifests.is_empty() {
        debug!(?dir, "no checksum manifest found, skipping verification");
        return result;
    }

    for manifest_path in &manifests {
        debug!(?manifest_path, "found checksum manifest");
        verify_manifest(manifest_path, &mut result).await;
    }
    result.manifests = manifests;

    info!(
        ?dir,
        passed = result.passed,
        records = result.records_checked,
        mismatches = result.mismatches.len(),
        "checksum verification complete"
    );

    result
}

async fn verify_manifest(manifest_path: &Path, result: &mut VerificationResult) {
    let raw = match tokio::fs::read(manifest_path).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(?manifest_path, error = %e, "failed to read checksum manifest");
            result.passed = false;
            result.mismatches.push(manifest_path.display().to_string());
            return;
        }
    };

    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let text = String::from_utf8_lossy(&raw);

    for record in parse_manifest(&text) {
        result.records_checked += 1;

        let Some(expected) = record.expected.as_deref() else {
            warn!(?manifest_path, file = %record.file_name, "manifest line has no checksum");
            result.passed = false;
            result.mismatches.push(record.file_name);
            continue;
        };

        let target = base.join(&record.file_name);
        match crc32_file(&target).await {
            Ok(crc) if checksum_matches(crc, expected) => {
                debug!(file = %record.file_name, crc = %format_crc32(crc), "checksum ok");
            }
            Ok(crc) => {
                warn!(
                    file = %record.file_name,
                    expected = %normalize_checksum(expected),
                    actual = %format_crc32(crc),
                    "checksum does not match"
                );
                result.passed = false;
                result.mismatches.push(record.file_name);
            }
            Err(e) => {
                warn!(?target, error = %e, "could not hash file listed in manifest");
                result.passed = false;
                result.mismatches.push(record.file_name);
            }
        }
    }
}
