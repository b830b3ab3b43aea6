use std::collections::hash_map::DefaultHasher;
use std::fs::File;
use std::hash::Hasher;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Error;

/// Compute a checksum of a file that does not depend on the order of its lines.
///
/// Each raw line, '\n' included, is hashed with SipHash using fixed keys and the hashes are
/// summed with 64 bit wrapping addition. Two files containing the same multiset of lines have
/// the same checksum. Collisions are possible, use it to verify tests, not data integrity.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use disksort::checksum::checksum_ignore_order;
///
/// fn same_lines(a: &Path, b: &Path) -> Result<bool, anyhow::Error> {
///     Ok(checksum_ignore_order(a)? == checksum_ignore_order(b)?)
/// }
/// ```
pub fn checksum_ignore_order(path: &Path) -> Result<u64, anyhow::Error> {
    let file = File::open(path)
        .map_err(|e| Error::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    let mut sum: u64 = 0;
    while reader.read_until(b'\n', &mut line).map_err(|e| Error::io(path, e))? > 0 {
        let mut hasher = DefaultHasher::new();
        hasher.write(&line);
        sum = sum.wrapping_add(hasher.finish());
        line.clear();
    }
    Ok(sum)
}
