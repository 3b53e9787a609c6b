//! Pack manifest reader.
//!
//! The manifest (`.e12pack`) sits in the pack root and lists one
//! sub-directory per line. Lines are trimmed and blank lines are skipped.
//! A manifest with nothing to pack is an error, never a silent no-op.

use std::fs;
use std::path::Path;

use crate::error::{PackError, Result};

/// File name of the manifest inside the pack root
pub const MANIFEST_FILE: &str = ".e12pack";

/// Read the manifest at `path` into its ordered list of entries.
pub fn read_manifest(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| PackError::manifest(path, e))?;
    parse_manifest(&content).ok_or_else(|| PackError::EmptyManifest {
        path: path.to_path_buf(),
    })
}

/// Split manifest text into entries, `None` when it names no directories.
pub fn parse_manifest(content: &str) -> Option<Vec<String>> {
    let entries: Vec<String> = content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_keeps_order() {
        let entries = parse_manifest("  Alpha\r\nbeta  \n\tGamma\n").unwrap();
        assert_eq!(entries, vec!["Alpha", "beta", "Gamma"]);
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let entries = parse_manifest("alpha\n\n   \nbeta").unwrap();
        assert_eq!(entries, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_parse_empty_and_whitespace_only() {
        assert!(parse_manifest("").is_none());
        assert!(parse_manifest("\n \n\t\r\n").is_none());
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_manifest(dir.path().join(MANIFEST_FILE)).unwrap_err();
        assert!(matches!(err, PackError::Manifest { .. }));
    }

    #[test]
    fn test_read_zero_byte_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, "").unwrap();
        let err = read_manifest(&path).unwrap_err();
        assert!(matches!(err, PackError::EmptyManifest { .. }));
    }
}
