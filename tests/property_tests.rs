//! Property-based tests for e12pack
//!
//! These tests verify:
//! - Artifact naming (lowercase entry + archive extension, inside output dir)
//! - Manifest parsing invariants (order, trimming, blank handling)

use proptest::prelude::*;
use std::path::Path;

use e12pack::job::artifact_file_name;
use e12pack::manifest::parse_manifest;
use e12pack::{ARCHIVE_EXTENSION, PackJob};

/// Directory-name-like manifest entries
fn entry_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_@][A-Za-z0-9_@.-]{0,24}"
}

proptest! {
    /// Output artifact lives directly in the output dir and is the lowercased entry
    #[test]
    fn artifact_path_is_lowercased_entry(entry in entry_strategy()) {
        let job = PackJob::for_entry(Path::new("/pack"), Path::new("/out"), &entry);

        prop_assert_eq!(job.source_dir, Path::new("/pack").join(&entry));
        prop_assert_eq!(job.output_artifact.parent(), Some(Path::new("/out")));
        let expected = format!("{}.{}", entry.to_lowercase(), ARCHIVE_EXTENSION);
        prop_assert_eq!(artifact_file_name(&entry), expected.clone());
        prop_assert_eq!(
            job.output_artifact.file_name().and_then(|n| n.to_str()),
            Some(expected.as_str())
        );
    }

    /// Entries come back in order, trimmed, regardless of padding and line endings
    #[test]
    fn manifest_preserves_order(
        entries in prop::collection::vec(entry_strategy(), 1..20),
        pad in "[ \t]{0,3}",
        crlf in any::<bool>(),
    ) {
        let newline = if crlf { "\r\n" } else { "\n" };
        let text: String = entries
            .iter()
            .map(|e| format!("{pad}{e}{pad}{newline}"))
            .collect();

        let parsed = parse_manifest(&text).expect("non-empty manifest");
        prop_assert_eq!(parsed, entries);
    }

    /// Whitespace-only manifests never produce entries
    #[test]
    fn whitespace_manifest_is_empty(text in "[ \t\r\n]{0,40}") {
        prop_assert!(parse_manifest(&text).is_none());
    }
}
