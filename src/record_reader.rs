use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use regex::Regex;

use crate::dialect::Dialect;
use crate::error::Error;
use crate::line_record::LineRecord;
use crate::order::Order;

/// Reads lines ending with a configurable terminator. The terminator is not part of the
/// returned line.
pub(crate) struct LineReader<R: BufRead> {
    reader: R,
    terminator: Vec<u8>,
    universal_newlines: bool,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(reader: R, dialect: &Dialect) -> LineReader<R> {
        LineReader {
            reader,
            terminator: dialect.line_terminator().to_vec(),
            universal_newlines: dialect.universal_newlines(),
        }
    }

    /// Read the next line into `line`, replacing its content. Returns false at end of input.
    pub(crate) fn read_line(&mut self, line: &mut Vec<u8>) -> std::io::Result<bool> {
        line.clear();
        let last = *self.terminator.last().unwrap_or(&b'\n');
        loop {
            let n = self.reader.read_until(last, line)?;
            if n == 0 {
                return Ok(!line.is_empty());
            }

            if self.universal_newlines {
                if line.ends_with(b"\n") {
                    line.pop();
                    if line.ends_with(b"\r") {
                        line.pop();
                    }
                    return Ok(true);
                }
            } else if line.ends_with(&self.terminator) {
                line.truncate(line.len() - self.terminator.len());
                return Ok(true);
            }

            if line.last() != Some(&last) {
                // end of input without terminator
                return Ok(true);
            }
        }
    }
}

/// Reads [LineRecord]s from a file, skipping ignored lines and reporting malformed lines as
/// [Error::Format].
pub(crate) struct RecordReader {
    path: PathBuf,
    reader: LineReader<BufReader<File>>,
    key: usize,
    field_separator: char,
    order: Order,
    ignore_empty: bool,
    ignore_lines: Option<Regex>,
    line_number: usize,
    buffer: Vec<u8>,
}

impl RecordReader {
    pub(crate) fn new(
        path: &PathBuf,
        dialect: &Dialect,
        key: usize,
        order: Order,
        ignore_empty: bool,
        ignore_lines: Option<Regex>,
    ) -> Result<RecordReader, anyhow::Error> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Ok(
            RecordReader {
                path: path.clone(),
                reader: LineReader::new(BufReader::new(file), dialect),
                key,
                field_separator: dialect.field_separator(),
                order,
                ignore_empty,
                ignore_lines,
                line_number: 0,
                buffer: Vec::new(),
            }
        )
    }

    pub(crate) fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Line number of the record last returned, starting at 1
    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }

    pub(crate) fn next_record(&mut self) -> Result<Option<LineRecord>, anyhow::Error> {
        loop {
            let more = self.reader.read_line(&mut self.buffer)
                .map_err(|e| Error::io(&self.path, e))?;
            if !more {
                return Ok(None);
            }
            self.line_number += 1;

            let line = std::str::from_utf8(&self.buffer)
                .map_err(|e| Error::Format {
                    path: self.path.clone(),
                    line: self.line_number,
                    message: e.to_string(),
                })?;

            if self.ignore_empty && line.trim().is_empty() {
                continue;
            }

            if let Some(r) = &self.ignore_lines {
                if r.is_match(line.trim()) {
                    continue;
                }
            }

            let line_record = LineRecord::new(line, self.key, self.field_separator, self.order)
                .map_err(|message| Error::Format {
                    path: self.path.clone(),
                    line: self.line_number,
                    message,
                })?;
            return Ok(Some(line_record));
        }
    }
}
