//! Append-only access to the persisted telemetry log.
//!
//! [`LogFile`] is a stateless handle on a path. Every operation opens the
//! file, does its work and closes it again; there is no connection state to
//! track between calls.
//!
//! # File Format
//!
//! Plain UTF-8 text, one record per `\n`-terminated line, encoded by
//! [`format_line`]. Writes only ever append.
//!
//! # Durability
//!
//! `append` and `append_all` write each batch with one call and then
//! `sync_data` before returning, so a successful return means the lines
//! reached the device. A failed batch is truncated away, and a torn final
//! line left by a crash is terminated before anything new is appended.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::codec::{format_line, parse_line};
use crate::error::{FormatError, PersistError, Result};
use crate::record::LogRecord;

/// A line that was skipped while reading the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiagnostic {
    /// 1-based line number within the file.
    pub line_number: usize,
    /// Why the line was rejected.
    pub error: FormatError,
}

/// Counts from one streaming pass over the log.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Well-formed lines handed to the sink.
    pub parsed: usize,
    /// One entry per malformed line that was skipped.
    pub diagnostics: Vec<LineDiagnostic>,
}

/// Everything recovered from one pass over the log.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    /// Records decoded from well-formed lines, in file order.
    pub records: Vec<LogRecord>,
    /// One entry per malformed line that was skipped.
    pub diagnostics: Vec<LineDiagnostic>,
}

/// Handle on the backing log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    path: PathBuf,
}

impl LogFile {
    /// Creates a handle for the log at `path`. The file is not touched.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    /// Appends one record and syncs it to disk.
    ///
    /// The file is created if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Open`] if the file cannot be opened for
    /// appending, [`PersistError::Write`] if the line cannot be written and
    /// [`PersistError::Sync`] if the data cannot be synced.
    pub fn append(&self, record: &LogRecord) -> Result<()> {
        self.append_all(std::iter::once(record)).map(|_| ())
    }

    /// Appends a sequence of records with a single open and a single sync.
    ///
    /// Returns the number of lines written. If the file ends in a torn line
    /// (no trailing `\n`), a newline is written first so the new records
    /// start on a line of their own.
    ///
    /// # Errors
    ///
    /// Same as [`append`](Self::append). On a write or sync error the file is
    /// truncated back to its length before the call, so a retry does not
    /// leave a fragment behind.
    pub fn append_all<'a, I>(&self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a LogRecord>,
    {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PersistError::Open {
                path: self.display(),
                source: e,
            })?;

        let open_error = |e| PersistError::Open {
            path: self.display(),
            source: e,
        };
        let start_len = file.metadata().map_err(open_error)?.len();
        let complete = ends_with_newline(&mut file, start_len).map_err(open_error)?;

        let mut payload = String::new();
        if !complete {
            tracing::warn!(
                "'{}' ends in a torn line, starting a new one",
                self.path.display()
            );
            payload.push('\n');
        }
        let mut written = 0;
        for record in records {
            payload.push_str(&format_line(record));
            payload.push('\n');
            written += 1;
        }

        if let Err(e) = file.write_all(payload.as_bytes()) {
            self.rollback(&file, start_len);
            return Err(PersistError::Write {
                path: self.display(),
                source: e,
            }
            .into());
        }
        if let Err(e) = file.sync_data() {
            self.rollback(&file, start_len);
            return Err(PersistError::Sync {
                path: self.display(),
                source: e,
            }
            .into());
        }

        Ok(written)
    }

    /// Truncates the file back to `len` after a failed append.
    fn rollback(&self, file: &File, len: u64) {
        if let Err(e) = file.set_len(len) {
            tracing::error!(
                "failed to truncate '{}' back to {len} bytes: {e}",
                self.path.display()
            );
        }
    }

    /// Decodes the log line by line, handing each record to `sink` in file
    /// order.
    ///
    /// Only the current line is held in memory, so the cost of a scan does
    /// not depend on the length of the log. Malformed lines, including lines
    /// that are not valid UTF-8, are skipped, logged at `warn` level and
    /// reported in [`ScanSummary::diagnostics`].
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Open`] if the file cannot be opened and
    /// [`PersistError::Read`] if reading fails part way through. Records
    /// before the failure have already been handed to `sink`.
    pub fn read_each<F>(&self, mut sink: F) -> Result<ScanSummary>
    where
        F: FnMut(LogRecord),
    {
        let file = File::open(&self.path).map_err(|e| PersistError::Open {
            path: self.display(),
            source: e,
        })?;

        let mut reader = BufReader::new(file);
        let mut summary = ScanSummary::default();
        let mut buf = Vec::new();
        let mut line_number = 0;

        loop {
            buf.clear();
            line_number += 1;
            let n = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| PersistError::Read {
                    path: self.display(),
                    line: line_number,
                    source: e,
                })?;
            if n == 0 {
                break;
            }
            if buf.last() == Some(&b'\n') {
                buf.pop();
            }

            let decoded = std::str::from_utf8(&buf)
                .map_err(|_| FormatError::InvalidUtf8)
                .and_then(parse_line);

            match decoded {
                Ok(record) => {
                    summary.parsed += 1;
                    sink(record);
                }
                Err(error) => {
                    tracing::warn!(
                        "skipping line {line_number} of '{}': {error}",
                        self.path.display()
                    );
                    summary.diagnostics.push(LineDiagnostic { line_number, error });
                }
            }
        }

        Ok(summary)
    }

    /// Reads and decodes every line of the log into memory.
    ///
    /// Convenient for small logs and tests. Use [`read_each`](Self::read_each)
    /// when the log may be long.
    ///
    /// # Errors
    ///
    /// Same as [`read_each`](Self::read_each).
    pub fn read_all(&self) -> Result<LoadOutcome> {
        let mut records = Vec::new();
        let summary = self.read_each(|record| records.push(record))?;
        Ok(LoadOutcome {
            records,
            diagnostics: summary.diagnostics,
        })
    }
}

/// Whether a file of length `len` is empty or ends in `\n`.
fn ends_with_newline(file: &mut File, len: u64) -> std::io::Result<bool> {
    if len == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
