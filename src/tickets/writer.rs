//! Append-only writer for the generated ticket dataset.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::record::TicketRecord;
use crate::error::DatasetError;

/// Writes finalized ticket lines to the output file.
///
/// The file is truncated when the writer is created; afterwards lines are
/// only ever appended. Writes are buffered until [`DatasetWriter::flush`],
/// which the pipeline calls once per batch.
#[derive(Debug)]
pub struct DatasetWriter {
    path: PathBuf,
    out: BufWriter<File>,
    written: usize,
}

impl DatasetWriter {
    /// Creates the parent directory if needed and truncates `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the directory or file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| DatasetError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        if path.exists() {
            debug!(path = %path.display(), "Discarding previous dataset contents");
        }

        let file = File::create(&path).map_err(|source| DatasetError::Truncate {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            out: BufWriter::new(file),
            written: 0,
        })
    }

    /// Appends one record as a single line.
    pub fn append(&mut self, record: &TicketRecord) -> Result<(), DatasetError> {
        writeln!(self.out, "{}", record).map_err(|source| DatasetError::Write {
            path: self.path.clone(),
            source,
        })?;
        self.written += 1;
        Ok(())
    }

    /// Flushes buffered lines to the file.
    pub fn flush(&mut self) -> Result<(), DatasetError> {
        self.out.flush().map_err(|source| DatasetError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Number of records appended since creation.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Output file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_makes_parent_directories() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("data").join("nested").join("tickets.txt");

        let writer = DatasetWriter::create(&path).expect("writer should be created");
        assert!(path.exists());
        assert_eq!(writer.written(), 0);
        assert_eq!(writer.path(), path.as_path());
    }

    #[test]
    fn test_create_truncates_previous_contents() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("tickets.txt");
        fs::write(&path, "stale line\n").expect("seed file");

        let mut writer = DatasetWriter::create(&path).expect("writer should be created");
        writer.flush().expect("flush");

        assert_eq!(fs::read_to_string(&path).expect("read"), "");
    }

    #[test]
    fn test_append_and_flush() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("tickets.txt");
        let mut writer = DatasetWriter::create(&path).expect("writer should be created");

        writer
            .append(&TicketRecord::new("12345", "Printer jam.", "New", "2025-03-10"))
            .expect("append");
        writer
            .append(&TicketRecord::new("10000", "VPN drop.", "Resolved", "2025-02-02"))
            .expect("append");
        writer.flush().expect("flush");

        let contents = fs::read_to_string(&path).expect("read");
        assert_eq!(
            contents,
            "Ticket #12345: Printer jam. - Status: New - Created: 2025-03-10\n\
             Ticket #10000: VPN drop. - Status: Resolved - Created: 2025-02-02\n"
        );
        assert_eq!(writer.written(), 2);
    }

    #[test]
    fn test_create_fails_when_parent_is_a_file() {
        let dir = TempDir::new().expect("tempdir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").expect("seed file");

        let err = DatasetWriter::create(blocker.join("tickets.txt")).expect_err("must fail");
        assert!(matches!(err, DatasetError::CreateDir { .. }));
    }

    #[test]
    fn test_create_fails_when_path_is_a_directory() {
        let dir = TempDir::new().expect("tempdir");
        let err = DatasetWriter::create(dir.path()).expect_err("must fail");
        assert!(matches!(err, DatasetError::Truncate { .. }));
    }
}
