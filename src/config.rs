use std::path::PathBuf;

use regex::Regex;

use crate::dialect::Dialect;
use crate::order::Order;
use crate::record_reader::RecordReader;
use crate::split::ChunkSize;

/// What to do when a chunk sort task fails
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop starting new chunk tasks, wait for the running ones and fail the whole batch with
    /// the first error
    Abort,
    /// Keep sorting the remaining chunks and report failed chunks in the [crate::sort::SortReport]
    Skip,
}

#[derive(Clone)]
pub(crate) struct Config {
    tmp: PathBuf,
    tmp_prefix: String,
    tasks: usize,
    queue_size: usize,
    dialect: Dialect,
    key: usize,
    order: Order,
    has_header: bool,
    ignore_empty: bool,
    ignore_lines: Option<Regex>,
    chunk_size: ChunkSize,
    in_place: bool,
    failure_policy: FailurePolicy,
    atomic_output: bool,
}

impl Config {
    pub(crate) fn new(
        tmp: PathBuf,
        tmp_prefix: String,
        tasks: usize,
        dialect: Dialect,
        key: usize,
        order: Order,
        has_header: bool,
        ignore_empty: bool,
        ignore_lines: Option<Regex>,
        chunk_size: ChunkSize,
        in_place: bool,
        failure_policy: FailurePolicy,
        atomic_output: bool,
    ) -> Config {
        let queue_size = 4096;
        Config {
            tmp,
            tmp_prefix,
            tasks,
            queue_size,
            dialect,
            key,
            order,
            has_header,
            ignore_empty,
            ignore_lines,
            chunk_size,
            in_place,
            failure_policy,
            atomic_output,
        }
    }

    pub(crate) fn tmp(&self) -> &PathBuf {
        &self.tmp
    }

    pub(crate) fn tmp_prefix(&self) -> &String {
        &self.tmp_prefix
    }

    pub(crate) fn tasks(&self) -> usize {
        self.tasks
    }

    pub(crate) fn queue_size(&self) -> usize {
        self.queue_size
    }

    pub(crate) fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub(crate) fn key(&self) -> usize {
        self.key
    }

    pub(crate) fn order(&self) -> Order {
        self.order
    }

    pub(crate) fn has_header(&self) -> bool {
        self.has_header
    }

    pub(crate) fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    pub(crate) fn in_place(&self) -> bool {
        self.in_place
    }

    pub(crate) fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub(crate) fn atomic_output(&self) -> bool {
        self.atomic_output
    }

    pub(crate) fn with_dialect(&self, dialect: Dialect) -> Config {
        let mut config = self.clone();
        config.dialect = dialect;
        config
    }

    pub(crate) fn record_reader(&self, path: &PathBuf) -> Result<RecordReader, anyhow::Error> {
        RecordReader::new(
            path,
            &self.dialect,
            self.key,
            self.order,
            self.ignore_empty,
            self.ignore_lines.clone(),
        )
    }
}
