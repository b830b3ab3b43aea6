use std::cmp::Ordering;
use std::path::PathBuf;

use anyhow::{anyhow, Context};

use crate::dialect::Dialect;
use crate::error::Error;
use crate::line_record::LineRecord;
use crate::order::Order;
use crate::output_file::OutputFile;
use crate::record_reader::RecordReader;

/// Inner equi-join of two files ordered by their join keys
///
/// Both inputs must be sorted by their key in the join [Order]. Records sharing a key form a
/// group and every record of a left group is paired with every record of the matching right
/// group. Groups without a match on the other side produce nothing. Keys are compared as
/// strings, so numeric keys need to be zero padded to join in numeric order.
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use disksort::join::Join;
///
/// fn join_on_first_field(left: PathBuf, right: PathBuf, output: PathBuf) -> Result<usize, anyhow::Error> {
///     let join = Join::new(left, right, 0, 0);
///     join.join(output)
/// }
/// ```
pub struct Join {
    left: PathBuf,
    right: PathBuf,
    left_key: usize,
    right_key: usize,
    dialect: Dialect,
    order: Order,
    output_separator: char,
    verify_order: bool,
    atomic_output: bool,
}

impl Join {
    /// Create a default Join definition.
    ///
    /// * the input dialect is [Dialect::default]
    /// * inputs are in ascending order
    /// * output fields are separated with ','
    /// * input order is verified
    /// * the output is written atomically
    pub fn new(left: PathBuf, right: PathBuf, left_key: usize, right_key: usize) -> Join {
        Join {
            left,
            right,
            left_key,
            right_key,
            dialect: Dialect::default(),
            order: Order::Asc,
            output_separator: ',',
            verify_order: true,
            atomic_output: true,
        }
    }

    /// Set the input [Dialect]
    pub fn with_dialect(&mut self, dialect: Dialect) {
        self.dialect = dialect;
    }

    /// Set the [Order] both inputs are sorted in. The default is [Order::Asc]
    pub fn with_order(&mut self, order: Order) {
        self.order = order;
    }

    /// Set the separator of output fields. The default is ','
    pub fn with_output_separator(&mut self, output_separator: char) {
        self.output_separator = output_separator;
    }

    /// Fail with [Error::Precondition] when an input key goes backwards. The default is true.
    /// When false, unordered input produces unspecified results.
    pub fn with_verify_order(&mut self, verify_order: bool) {
        self.verify_order = verify_order;
    }

    /// Write the output to a temporary file renamed into place on success. The default is true
    pub fn with_atomic_output(&mut self, atomic_output: bool) {
        self.atomic_output = atomic_output;
    }

    /// Open both inputs and return a lazy iterator over joined rows, left fields followed by
    /// right fields
    pub fn iter(&self) -> Result<JoinIterator, anyhow::Error> {
        let left = GroupCursor::new(
            RecordReader::new(&self.left, &self.dialect, self.left_key, self.order, false, None)?,
            self.order,
            self.verify_order,
        )?;
        let right = GroupCursor::new(
            RecordReader::new(&self.right, &self.dialect, self.right_key, self.order, false, None)?,
            self.order,
            self.verify_order,
        )?;
        Ok(JoinIterator::new(left, right, self.order))
    }

    /// Write joined rows to `output`, one per line. Returns the number of rows.
    pub fn join(&self, output: PathBuf) -> Result<usize, anyhow::Error> {
        log::info!(
            "Joining {} on field {} with {} on field {}",
            self.left.display(),
            self.left_key,
            self.right.display(),
            self.right_key
        );
        let mut output_file = OutputFile::create(&output, self.atomic_output)?;
        let mut buffer = [0u8; 4];
        let separator: &str = self.output_separator.encode_utf8(&mut buffer);
        let mut rows = 0;
        for row in self.iter()? {
            let row = row?;
            output_file.write_line(&row.join(separator))?;
            rows += 1;
        }
        output_file.commit()
            .with_context(|| anyhow!("join output: {}", output.display()))?;
        log::info!("Finished join, {} rows", rows);
        Ok(rows)
    }
}

/// A maximal run of consecutive records with the same key
pub(crate) struct KeyGroup {
    key: String,
    records: Vec<LineRecord>,
}

/// Reads a key ordered input one [KeyGroup] at a time
pub(crate) struct GroupCursor {
    reader: RecordReader,
    lookahead: Option<LineRecord>,
    lookahead_line: usize,
    previous_key: Option<String>,
    order: Order,
    verify_order: bool,
}

impl GroupCursor {
    pub(crate) fn new(mut reader: RecordReader, order: Order, verify_order: bool) -> Result<GroupCursor, anyhow::Error> {
        let lookahead = reader.next_record()?;
        let lookahead_line = reader.line_number();
        Ok(
            GroupCursor {
                reader,
                lookahead,
                lookahead_line,
                previous_key: None,
                order,
                verify_order,
            }
        )
    }

    /// Next group or None when the input is exhausted
    pub(crate) fn next_group(&mut self) -> Result<Option<KeyGroup>, anyhow::Error> {
        let first = match self.lookahead.take() {
            None => return Ok(None),
            Some(first) => first,
        };
        let key = first.key().to_string();

        if self.verify_order {
            if let Some(previous_key) = &self.previous_key {
                if self.order.apply(key.as_str().cmp(previous_key.as_str())) != Ordering::Greater {
                    return Err(
                        Error::Precondition {
                            path: self.reader.path().clone(),
                            line: self.lookahead_line,
                            message: format!("key '{}' follows key '{}', input is not ordered by its join key", key, previous_key),
                        }.into()
                    );
                }
            }
        }

        let mut records = vec![first];
        loop {
            match self.reader.next_record()? {
                None => break,
                Some(line_record) => {
                    if line_record.key() == key {
                        records.push(line_record);
                    } else {
                        self.lookahead = Some(line_record);
                        self.lookahead_line = self.reader.line_number();
                        break;
                    }
                }
            }
        }
        self.previous_key = Some(key.clone());
        Ok(Some(KeyGroup { key, records }))
    }
}

/// Lazy sort-merge inner join, see [Join::iter]
pub struct JoinIterator {
    left: GroupCursor,
    right: GroupCursor,
    order: Order,
    left_group: Option<KeyGroup>,
    right_group: Option<KeyGroup>,
    product: Option<(Vec<LineRecord>, Vec<LineRecord>)>,
    i: usize,
    j: usize,
    done: bool,
}

impl JoinIterator {
    pub(crate) fn new(left: GroupCursor, right: GroupCursor, order: Order) -> JoinIterator {
        JoinIterator {
            left,
            right,
            order,
            left_group: None,
            right_group: None,
            product: None,
            i: 0,
            j: 0,
            done: false,
        }
    }

    /// Advance the group cursors until a matching pair of groups is found. Returns false when
    /// either side is exhausted.
    fn next_match(&mut self) -> Result<bool, anyhow::Error> {
        loop {
            if self.left_group.is_none() {
                self.left_group = self.left.next_group()?;
            }
            if self.right_group.is_none() {
                self.right_group = self.right.next_group()?;
            }

            match (self.left_group.take(), self.right_group.take()) {
                (Some(left_group), Some(right_group)) => {
                    match self.order.apply(left_group.key.cmp(&right_group.key)) {
                        Ordering::Equal => {
                            self.product = Some((left_group.records, right_group.records));
                            self.i = 0;
                            self.j = 0;
                            return Ok(true);
                        }
                        Ordering::Less => {
                            self.right_group = Some(right_group);
                        }
                        Ordering::Greater => {
                            self.left_group = Some(left_group);
                        }
                    }
                }
                _ => return Ok(false),
            }
        }
    }

    fn next_row(&mut self) -> Option<Vec<String>> {
        let (left, right) = self.product.as_ref()?;
        if self.i >= left.len() || right.is_empty() {
            return None;
        }
        let mut row = Vec::with_capacity(left[self.i].fields().len() + right[self.j].fields().len());
        row.extend_from_slice(left[self.i].fields());
        row.extend_from_slice(right[self.j].fields());
        self.j += 1;
        if self.j == right.len() {
            self.j = 0;
            self.i += 1;
        }
        Some(row)
    }
}

impl Iterator for JoinIterator {
    type Item = Result<Vec<String>, anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if let Some(row) = self.next_row() {
                return Some(Ok(row));
            }
            self.product = None;

            match self.next_match() {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
