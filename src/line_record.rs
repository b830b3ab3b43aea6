use std::cmp::Ordering;

use crate::order::Order;

/// A parsed line. Ordering and equality consider only the key field, so a stable sort over
/// records keeps the input order of equal keys.
#[derive(Debug)]
pub(crate) struct LineRecord {
    fields: Vec<String>,
    key: usize,
    order: Order,
}

impl LineRecord {
    pub(crate) fn new(line: &str, key: usize, field_separator: char, order: Order) -> Result<LineRecord, String> {
        let fields: Vec<String> = line.split(field_separator).map(|s| s.to_string()).collect();
        if key >= fields.len() {
            Err(
                format!(
                    "requested key field {} but there are only {} fields using '{}' as field separator",
                    key,
                    fields.len(),
                    field_separator,
                )
            )
        } else {
            Ok(
                LineRecord {
                    fields,
                    key,
                    order,
                }
            )
        }
    }

    pub(crate) fn key(&self) -> &str {
        self.fields[self.key].as_str()
    }

    pub(crate) fn fields(&self) -> &Vec<String> {
        &self.fields
    }

    /// Encode the record with `field_separator`, without line terminator
    pub(crate) fn encode(&self, field_separator: char) -> String {
        let mut buffer = [0u8; 4];
        let separator: &str = field_separator.encode_utf8(&mut buffer);
        self.fields.join(separator)
    }
}

impl Eq for LineRecord {}

impl PartialEq<Self> for LineRecord {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl PartialOrd<Self> for LineRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LineRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order.apply(self.key().cmp(other.key()))
    }
}
