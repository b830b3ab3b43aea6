/// Describes how records are laid out in a delimited text file.
///
/// # Examples
/// ```
/// use disksort::dialect::Dialect;
/// // tab separated, unix line endings
/// let dialect = Dialect::default()
///     .with_field_separator('\t')
///     .with_line_terminator(b"\n");
/// assert_eq!(dialect.field_separator(), '\t');
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dialect {
    field_separator: char,
    line_terminator: Vec<u8>,
}

impl Dialect {
    /// Create a new [Dialect]
    ///
    /// # Arguments
    /// * `field_separator` - separates fields within a line
    /// * `line_terminator` - a non empty byte sequence ending each line
    pub fn new(field_separator: char, line_terminator: &[u8]) -> Dialect {
        Dialect {
            field_separator,
            line_terminator: line_terminator.to_vec(),
        }
    }

    /// Get the field separator
    pub fn field_separator(&self) -> char {
        self.field_separator
    }

    /// Get the line terminator
    pub fn line_terminator(&self) -> &[u8] {
        &self.line_terminator
    }

    /// Set the field separator. The default is ','
    pub fn with_field_separator(mut self, field_separator: char) -> Dialect {
        self.field_separator = field_separator;
        self
    }

    /// Set the line terminator. The default is CRLF. An empty terminator is replaced by '\n'
    pub fn with_line_terminator(mut self, line_terminator: &[u8]) -> Dialect {
        if line_terminator.is_empty() {
            self.line_terminator = b"\n".to_vec();
        } else {
            self.line_terminator = line_terminator.to_vec();
        }
        self
    }

    /// Terminators ending in '\n' also accept a bare '\n' when reading records
    pub(crate) fn universal_newlines(&self) -> bool {
        universal_newlines(&self.line_terminator)
    }
}

pub(crate) fn universal_newlines(line_terminator: &[u8]) -> bool {
    line_terminator.last() == Some(&b'\n')
}

/// The byte sequence that ends a line when scanning raw bytes. With universal newlines a line
/// ends at the first '\n', which also ends every CRLF line.
pub(crate) fn line_end_marker(line_terminator: &[u8]) -> &[u8] {
    if line_terminator.is_empty() || universal_newlines(line_terminator) {
        b"\n"
    } else {
        line_terminator
    }
}

impl Default for Dialect {
    /// Comma separated fields, CRLF line terminator
    fn default() -> Self {
        Dialect {
            field_separator: ',',
            line_terminator: b"\r\n".to_vec(),
        }
    }
}
