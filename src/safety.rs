//! Output path guard for the CLI.
//!
//! Verification results are written as JSON; these checks stop a typo from
//! overwriting the listening history or the candidate catalog it was
//! computed from.

use anyhow::{bail, Result};
use std::path::Path;

/// File name fragments used by listening-history exports.
const HISTORY_EXPORT_PATTERNS: [&str; 3] = ["StreamingHistory", "endsong", "Streaming_History"];

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output must have a `.json` extension
/// - Output cannot be the same as any of the provided source paths
/// - Output cannot look like a listening-history export
pub fn validate_output_path(output: &Path, source_paths: &[&Path]) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if output.extension().and_then(|e| e.to_str()) != Some("json") {
        bail!(
            "Safety check failed: output file '{}' must have a .json extension",
            output.display()
        );
    }

    for source in source_paths {
        if output == *source {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    for pattern in HISTORY_EXPORT_PATTERNS {
        if output_name.contains(pattern) {
            bail!(
                "Safety check failed: output '{}' matches listening-history pattern '{}'",
                output.display(),
                pattern
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_output() {
        let output = PathBuf::from("/tmp/verified-artists.json");
        let history = PathBuf::from("/data/history.json");
        let catalog = PathBuf::from("/data/catalog.json");
        assert!(validate_output_path(&output, &[&history, &catalog]).is_ok());
    }

    #[test]
    fn test_wrong_extension() {
        let output = PathBuf::from("/tmp/verified.txt");
        let result = validate_output_path(&output, &[]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must have a .json extension"));
    }

    #[test]
    fn test_output_equals_source() {
        let path = PathBuf::from("/data/catalog.json");
        let result = validate_output_path(&path, &[&path]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as source"));
    }

    #[test]
    fn test_history_export_blocked() {
        let output = PathBuf::from("/tmp/StreamingHistory0.json");
        assert!(validate_output_path(&output, &[]).is_err());
    }
}
