//! Text decoder and table encoder at the pipeline boundary.
//!
//! Input format, one record per line:
//! ```text
//! alpha;4;1.5
//! beta;7;2
//! ```
//!
//! - Lines with fewer than 3 fields are skipped
//! - Fields past the third are ignored
//! - A number or value that fails to parse becomes zero
//! - Bytes that are not valid UTF-8 are replaced, not rejected
//!
//! Output format:
//! ```text
//! | Text | Number | Value |
//! | alpha | 4 | 1.50 |
//! ```

use crate::Record;
use std::io::{self, BufRead, Write};

/// Default field delimiter.
pub const DEFAULT_DELIMITER: char = ';';

/// Header line written before any record.
pub const HEADER: &str = "| Text | Number | Value |";

/// Lazily decodes records from a line-oriented source.
///
/// Yields `Err` only for I/O failures of the underlying reader; malformed
/// lines are skipped or zero-defaulted and never surface as errors.
pub struct RecordDecoder<R> {
    reader: R,
    delimiter: char,
    line: Vec<u8>,
    skipped: usize,
}

impl<R: BufRead> RecordDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_delimiter(reader, DEFAULT_DELIMITER)
    }

    pub fn with_delimiter(reader: R, delimiter: char) -> Self {
        Self {
            reader,
            delimiter,
            line: Vec::new(),
            skipped: 0,
        }
    }

    /// Number of lines dropped for having fewer than 3 fields.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for RecordDecoder<R> {
    type Item = io::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e)),
            }

            let text = String::from_utf8_lossy(&self.line);
            let line = text.trim_end_matches(['\n', '\r']);
            match parse_line(line, self.delimiter) {
                Some(record) => return Some(Ok(record)),
                None => {
                    self.skipped += 1;
                    tracing::trace!(line, "skipping malformed line");
                }
            }
        }
    }
}

/// Parse one line into a record, or `None` if it has fewer than 3 fields.
pub fn parse_line(line: &str, delimiter: char) -> Option<Record> {
    let mut fields = line.split(delimiter);
    let label = fields.next()?;
    let number = fields.next()?;
    let value = fields.next()?;

    Some(Record::new(
        label,
        number.parse().unwrap_or(0),
        value.parse().unwrap_or(0.0),
    ))
}

/// Which records the encoder leaves out of the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SkipPolicy {
    /// Omit records whose label is empty and whose number and value are
    /// both zero.
    #[default]
    AllBlank,
    /// Omit records whose label is empty, or whose number and value are
    /// both zero.
    AnyBlank,
}

impl SkipPolicy {
    /// True when `record` should not be written.
    pub fn skips(&self, record: &Record) -> bool {
        let zero = record.number() == 0 && record.value() == 0.0;
        match self {
            SkipPolicy::AllBlank => record.label().is_empty() && zero,
            SkipPolicy::AnyBlank => record.label().is_empty() || zero,
        }
    }
}

/// Writes finalized records as a text table.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordEncoder {
    policy: SkipPolicy,
}

impl RecordEncoder {
    pub fn new(policy: SkipPolicy) -> Self {
        Self { policy }
    }

    /// Format a single table row.
    pub fn format_row(record: &Record) -> String {
        format!(
            "| {} | {} | {:.2} |",
            record.label(),
            record.number(),
            record.value()
        )
    }

    /// Write the header and one row per kept record.
    ///
    /// Returns the number of rows written, header excluded.
    pub fn encode<W: Write>(&self, records: &[Record], out: &mut W) -> io::Result<usize> {
        writeln!(out, "{HEADER}")?;
        let mut written = 0;
        for record in records {
            if self.policy.skips(record) {
                continue;
            }
            writeln!(out, "{}", Self::format_row(record))?;
            written += 1;
        }
        out.flush()?;
        Ok(written)
    }

    /// Encode into a string.
    pub fn encode_to_string(&self, records: &[Record]) -> String {
        let mut buf = Vec::new();
        self.encode(records, &mut buf)
            .expect("writing to a Vec cannot fail");
        String::from_utf8_lossy(&buf).into_owned()
    }
}
