//! Consistency check for an existing ticket dataset.
//!
//! Re-parses every line of a dataset file with the same grammar used during
//! generation and reports malformed lines and repeated identifiers. The file
//! is only read.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use super::parser::parse_line;
use crate::error::DatasetError;

/// Result of checking a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Non-empty lines inspected.
    pub total_lines: usize,
    /// Lines matching the ticket grammar.
    pub valid: usize,
    /// 1-based line numbers that did not match the grammar.
    pub malformed_lines: Vec<usize>,
    /// Identifiers occurring more than once, with their occurrence count.
    pub duplicate_ids: BTreeMap<String, usize>,
}

impl CheckReport {
    /// True when every line parses and every identifier is unique.
    pub fn is_clean(&self) -> bool {
        self.malformed_lines.is_empty() && self.duplicate_ids.is_empty()
    }
}

/// Checks dataset contents already held in memory.
pub fn check_contents(contents: &str) -> CheckReport {
    let mut report = CheckReport::default();
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();

    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        report.total_lines += 1;

        match parse_line(line) {
            Ok(record) => {
                report.valid += 1;
                *seen.entry(record.id).or_insert(0) += 1;
            }
            Err(_) => report.malformed_lines.push(index + 1),
        }
    }

    report.duplicate_ids = seen.into_iter().filter(|(_, count)| *count > 1).collect();
    report
}

/// Reads and checks the dataset at `path`.
pub fn check_dataset(path: impl AsRef<Path>) -> Result<CheckReport, DatasetError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| DatasetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(check_contents(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_dataset() {
        let contents = "Ticket #12345: Printer jam. - Status: New - Created: 2025-03-10\n\
                        Ticket #10000: VPN drop. - Status: Resolved - Created: 2025-02-02\n";
        let report = check_contents(contents);

        assert_eq!(report.total_lines, 2);
        assert_eq!(report.valid, 2);
        assert!(report.is_clean());
    }

    #[test]
    fn test_reports_malformed_and_duplicates() {
        let contents = "Ticket #12345: Printer jam. - Status: New - Created: 2025-03-10\n\
                        \n\
                        garbage\n\
                        Ticket #12345: Printer jam again. - Status: New - Created: 2025-03-11\n\
                        Ticket #12345: And again. - Status: New - Created: 2025-03-12\n";
        let report = check_contents(contents);

        assert_eq!(report.total_lines, 4);
        assert_eq!(report.valid, 3);
        assert_eq!(report.malformed_lines, vec![3]);
        assert_eq!(report.duplicate_ids.get("12345"), Some(&3));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_check_dataset_reads_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("tickets.txt");
        fs::write(
            &path,
            "Ticket #55555: VPN drop. - Status: Resolved - Created: 2025-02-02\n",
        )
        .expect("seed file");

        let report = check_dataset(&path).expect("check should succeed");
        assert_eq!(report.valid, 1);
        assert!(report.is_clean());
    }

    #[test]
    fn test_check_dataset_missing_file() {
        let dir = TempDir::new().expect("tempdir");
        let err = check_dataset(dir.path().join("missing.txt")).expect_err("must fail");
        assert!(matches!(err, DatasetError::Read { .. }));
    }
}
