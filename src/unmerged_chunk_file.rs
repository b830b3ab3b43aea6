use std::cmp::Ordering;
use std::path::PathBuf;

use crate::config::Config;
use crate::line_record::LineRecord;
use crate::record_reader::RecordReader;

/// A sorted input of the k-way merge, positioned at its current record.
pub(crate) struct UnmergedChunkFile {
    index: usize,
    reader: RecordReader,
    head: Option<LineRecord>,
}

impl UnmergedChunkFile {
    pub(crate) fn new(index: usize, path: &PathBuf, config: &Config) -> Result<UnmergedChunkFile, anyhow::Error> {
        let mut reader = config.record_reader(path)?;
        let head = reader.next_record()?;
        Ok(
            UnmergedChunkFile {
                index,
                reader,
                head,
            }
        )
    }

    pub(crate) fn head(&self) -> Option<&LineRecord> {
        self.head.as_ref()
    }

    /// Return the current record and move to the next one
    pub(crate) fn advance(&mut self) -> Result<Option<LineRecord>, anyhow::Error> {
        let next = self.reader.next_record()?;
        Ok(std::mem::replace(&mut self.head, next))
    }

    pub(crate) fn path(&self) -> &PathBuf {
        self.reader.path()
    }
}

impl Eq for UnmergedChunkFile {}

impl PartialEq<Self> for UnmergedChunkFile {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for UnmergedChunkFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UnmergedChunkFile {
    // flipped to work with BinaryHeap (max heap): the smallest head is the greatest and equal
    // heads are broken by input index, the first input being the greatest
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.head, &other.head) {
            (Some(head), Some(other_head)) => {
                other_head.cmp(head).then_with(|| other.index.cmp(&self.index))
            }
            // exhausted files pop first so they can be dropped
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (None, None) => other.index.cmp(&self.index),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;
    use std::path::PathBuf;

    use crate::config::{Config, FailurePolicy};
    use crate::dialect::Dialect;
    use crate::order::Order;
    use crate::split::ChunkSize;
    use crate::unmerged_chunk_file::UnmergedChunkFile;

    fn config(order: Order) -> Config {
        Config::new(
            std::env::temp_dir(),
            "test-".to_string(),
            1,
            Dialect::default().with_line_terminator(b"\n"),
            0,
            order,
            false,
            false,
            None,
            ChunkSize::Bytes(1024),
            true,
            FailurePolicy::Abort,
            true,
        )
    }

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_heap_pops_smallest_then_first_input() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let config = config(Order::Asc);
        let first = write(&dir, "first.csv", "b,first\n");
        let second = write(&dir, "second.csv", "a,second\n");
        let third = write(&dir, "third.csv", "b,third\n");

        let mut heap = BinaryHeap::new();
        heap.push(UnmergedChunkFile::new(2, &third, &config)?);
        heap.push(UnmergedChunkFile::new(0, &first, &config)?);
        heap.push(UnmergedChunkFile::new(1, &second, &config)?);

        let order: Vec<PathBuf> = std::iter::from_fn(|| heap.pop().map(|f| f.path().clone())).collect();
        assert_eq!(order, vec![second, first, third]);
        Ok(())
    }

    #[test]
    fn test_heap_desc() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let config = config(Order::Desc);
        let low = write(&dir, "low.csv", "a\n");
        let high = write(&dir, "high.csv", "z\n");

        let mut heap = BinaryHeap::new();
        heap.push(UnmergedChunkFile::new(0, &low, &config)?);
        heap.push(UnmergedChunkFile::new(1, &high, &config)?);
        assert_eq!(heap.pop().unwrap().path(), &high);
        Ok(())
    }

    #[test]
    fn test_advance() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let config = config(Order::Asc);
        let path = write(&dir, "chunk.csv", "a,1\nb,2\n");
        let mut chunk = UnmergedChunkFile::new(0, &path, &config)?;
        assert_eq!(chunk.head().unwrap().key(), "a");
        assert_eq!(chunk.advance()?.unwrap().key(), "a");
        assert_eq!(chunk.head().unwrap().key(), "b");
        assert_eq!(chunk.advance()?.unwrap().key(), "b");
        assert!(chunk.head().is_none());
        assert!(chunk.advance()?.is_none());
        Ok(())
    }
}
