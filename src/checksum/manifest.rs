//! SFV manifest parsing
//!
//! One record per line: `<file name> <crc32>`. Parsing is loose: comment lines start
//! with `;`, blank lines are skipped, fields are split on any whitespace, the
//! first field is the file name and the last field is the checksum.

/// One line of a checksum manifest
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChecksumRecord {
    /// File name relative to the manifest's directory
    pub file_name: String,
    /// Expected CRC-32 as written in the manifest. `None` when the line holds a single
    /// field and therefore has no checksum to compare against.
    pub expected: Option<String>,
}

/// Parse manifest text into records
pub fn parse_manifest(text: &str) -> Vec<ChecksumRecord> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.trim_start().starts_with(';') {
                return None;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            let (first, rest) = fields.split_first()?;
            Some(ChecksumRecord {
                file_name: (*first).to_string(),
                expected: rest.last().map(|s| (*s).to_string()),
            })
        })
        .collect()
}

/// Canonical form of a hex checksum: leading zeros stripped, uppercase
///
/// `"00ff1a"`, `"FF1A"` and `"0FF1A"` all normalize to `"FF1A"`. An all-zero checksum
/// normalizes to the empty string on both sides of the comparison.
pub fn normalize_checksum(hex: &str) -> String {
    hex.trim().trim_start_matches('0').to_ascii_uppercase()
}

/// Render a computed CRC-32 the same way [`normalize_checksum`] renders manifest values
pub fn format_crc32(crc: u32) -> String {
    normalize_checksum(&format!("{crc:x}"))
}

/// Compare a computed CRC-32 against a manifest value, ignoring case and zero padding
pub fn checksum_matches(computed: u32, expected: &str) -> bool {
    format_crc32(computed) == normalize_checksum(expected)
}
