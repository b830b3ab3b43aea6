use std::cmp::max;
use std::collections::BinaryHeap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{anyhow, Context};
use command_executor::shutdown_mode::ShutdownMode;
use command_executor::thread_pool_builder::ThreadPoolBuilder;
use regex::Regex;
use rlimit::{getrlimit, Resource, setrlimit};

use crate::config::{Config, FailurePolicy};
use crate::dialect::Dialect;
use crate::error::Error;
use crate::line_record::LineRecord;
use crate::order::Order;
use crate::output_file::OutputFile;
use crate::sort_command::{BatchOutcome, SortCommand};
use crate::split::{ChunkSize, Split};
use crate::unmerged_chunk_file::UnmergedChunkFile;

/// Outcome of [Sort::sort_files]
#[derive(Debug, Default)]
pub struct SortReport {
    sorted: Vec<PathBuf>,
    failed: Vec<(PathBuf, String)>,
}

impl SortReport {
    /// Paths of the sorted files in input order
    pub fn sorted(&self) -> &Vec<PathBuf> {
        &self.sorted
    }

    /// Input paths that failed to sort with the error message, in input order. Empty unless
    /// [FailurePolicy::Skip] is used.
    pub fn failed(&self) -> &Vec<(PathBuf, String)> {
        &self.failed
    }
}

/// Sort, merge or check delimited text files by one key field
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use disksort::sort::Sort;
///
/// // sort a CSV file with a header by its third field using 2 cores and 16 MiB chunks
/// fn sort_by_third_field(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
///     let mut sort = Sort::new(vec![input], output);
///     sort.with_key(2);
///     sort.with_tasks(2);
///     sort.with_chunk_size_bytes(16 * 1024 * 1024);
///     // set the directory for intermediate results. The default is the system temp dir -
///     // std::env::temp_dir(), however, for large files it is recommended to provide a dedicated
///     // directory for intermediate files, preferably on the same file system as the output result.
///     sort.with_tmp_dir(tmp);
///     sort.sort()
/// }
/// ```
pub struct Sort {
    input_files: Vec<PathBuf>,
    output: PathBuf,
    tmp: PathBuf,
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
}

impl Sort {
    /// Create a default Sort definition.
    ///
    /// `output` is the target of [Sort::sort] and [Sort::merge]. [Sort::check] and
    /// [Sort::sort_files] do not write it.
    ///
    /// A default Sort definition will use the system temporary
    /// directory as defined by std::env::temp_dir().
    /// * the key is the first field, index 0
    /// * the default [Order] is Asc
    /// * the default [Dialect] is comma separated with CRLF line terminator
    /// * the first line of each input is a header and is dropped by [Sort::sort]
    /// * empty lines are sorted as records with a single empty field
    /// * input is split into chunks of 64 MiB
    /// * all available cores are used
    /// * [Sort::sort_files] sorts in place
    /// * a failed chunk fails the whole operation, see [FailurePolicy]
    /// * outputs are written to a temporary file and renamed into place on success
    ///
    /// The Sort implementation will increase the file descriptor rlimit to accommodate the files
    /// open during merge
    pub fn new(input_files: Vec<PathBuf>, output: PathBuf) -> Sort {
        Sort {
            input_files,
            output,
            tmp: std::env::temp_dir(),
            tasks: 0,
            dialect: Dialect::default(),
            key: 0,
            order: Order::Asc,
            has_header: true,
            ignore_empty: false,
            ignore_lines: None,
            chunk_size: ChunkSize::Bytes(64 * 1024 * 1024),
            in_place: true,
            failure_policy: FailurePolicy::Abort,
            atomic_output: true,
        }
    }

    /// Set directory for intermediate files. By default use std::env::temp_dir()
    /// It is recommended for large files to create a dedicated directory for intermediate files
    /// on the same file system as the output target
    pub fn with_tmp_dir(&mut self, tmp: PathBuf) {
        self.tmp = tmp;
    }

    /// Set the number of tasks. The default is zero which will result in using all system cores
    pub fn with_tasks(&mut self, tasks: usize) {
        self.tasks = tasks;
    }

    /// Set the [Dialect]
    pub fn with_dialect(&mut self, dialect: Dialect) {
        self.dialect = dialect;
    }

    /// Set the field separator. The default is ','
    pub fn with_field_separator(&mut self, field_separator: char) {
        self.dialect = self.dialect.clone().with_field_separator(field_separator);
    }

    /// Set the line terminator of the input. The default is CRLF. Outputs always end lines
    /// with '\n'
    pub fn with_line_terminator(&mut self, line_terminator: &[u8]) {
        self.dialect = self.dialect.clone().with_line_terminator(line_terminator);
    }

    /// Set the zero based index of the key field
    pub fn with_key(&mut self, key: usize) {
        self.key = key;
    }

    /// Set [Order]
    pub fn with_order(&mut self, order: Order) {
        self.order = order;
    }

    /// Sort in descending order when `reverse` is true
    pub fn with_reverse(&mut self, reverse: bool) {
        self.order = Order::from_reverse(reverse);
    }

    /// Specify whether the first line of each input is a header. The header is dropped from the
    /// output of [Sort::sort]. The default is true
    pub fn with_has_header(&mut self, has_header: bool) {
        self.has_header = has_header;
    }

    /// Direct the algorithm to ignore empty lines. The default is false
    pub fn with_ignore_empty(&mut self) {
        self.ignore_empty = true;
    }

    /// Specify which lines to ignore. Each line matching the regex will be ignored and will not
    /// appear in the output.
    pub fn with_ignore_lines(&mut self, r: Regex) {
        self.ignore_lines = Some(r)
    }

    /// The input will be read in chunks of 'chunk_size_bytes' respecting line boundaries
    pub fn with_chunk_size_bytes(&mut self, chunk_size_bytes: u64) {
        self.chunk_size = ChunkSize::Bytes(chunk_size_bytes);
    }

    /// The input will be read in chunks of 'chunk_size_mb' MiB respecting line boundaries
    pub fn with_chunk_size_mb(&mut self, chunk_size_mb: u64) {
        self.chunk_size = ChunkSize::Bytes(chunk_size_mb * 1024 * 1024);
    }

    /// Each input will be split into about 'chunks' chunks respecting line boundaries
    pub fn with_chunk_count(&mut self, chunks: usize) {
        self.chunk_size = ChunkSize::Count(chunks);
    }

    /// When false [Sort::sort_files] writes each sorted file next to its input with a `-sorted`
    /// suffix. The default is true
    pub fn with_in_place(&mut self, in_place: bool) {
        self.in_place = in_place;
    }

    /// Set the [FailurePolicy] for chunk sort tasks. The default is [FailurePolicy::Abort]
    pub fn with_failure_policy(&mut self, failure_policy: FailurePolicy) {
        self.failure_policy = failure_policy;
    }

    /// Write outputs to a temporary file renamed into place on success. The default is true
    pub fn with_atomic_output(&mut self, atomic_output: bool) {
        self.atomic_output = atomic_output;
    }

    /// Sort the input files into the output file.
    ///
    /// Each input is split into line aligned chunks in a temporary directory, the chunks are
    /// sorted in parallel and merged into the output. The temporary directory is removed on
    /// return.
    pub fn sort(&self) -> Result<(), anyhow::Error> {
        let config = self.create_config(true);
        Self::internal_sort(&self.input_files, &config, &self.output)
    }

    /// Sort each input file in memory, independently and in parallel. Each file is rewritten
    /// in place, or written next to its input with a `-sorted` suffix, see [Sort::with_in_place].
    /// Files are never merged, so the output given to [Sort::new] is ignored and may be empty:
    /// ```
    /// use std::path::PathBuf;
    /// use disksort::sort::{Sort, SortReport};
    ///
    /// fn sort_each(files: Vec<PathBuf>) -> Result<SortReport, anyhow::Error> {
    ///     Sort::new(files, PathBuf::new()).sort_files()
    /// }
    /// ```
    pub fn sort_files(&self) -> Result<SortReport, anyhow::Error> {
        let config = self.create_config(self.in_place);
        Self::internal_sort_files(&self.input_files, &config)
    }

    /// Merge sorted input files into the output file. Records with equal keys are taken from
    /// the inputs in the order the inputs are given.
    pub fn merge(&self) -> Result<(), anyhow::Error> {
        let config = self.create_config(true);
        let files = self.input_files.len();
        let lines = Self::with_raised_rlimit(files, || Self::internal_merge(&self.input_files, &config, &self.output))?;
        log::info!("Merged {} files into {}, {} lines", files, self.output.display(), lines);
        Ok(())
    }

    /// Check that every input file is sorted by the key
    pub fn check(&self) -> Result<bool, anyhow::Error> {
        let config = self.create_config(true);

        let mut result = true;
        for path in &self.input_files {
            result = Self::internal_check(path, &config)?;
            if !result {
                log::info!("Not sorted: {}", path.display());
                break;
            }
        }
        Ok(result)
    }

    fn create_config(&self, in_place: bool) -> Config {
        let mut tasks = self.tasks;
        if self.tasks == 0 {
            tasks = num_cpus::get();
        }

        Config::new(
            self.tmp.clone(),
            "disksort-".to_string(),
            tasks,
            self.dialect.clone(),
            self.key,
            self.order,
            self.has_header,
            self.ignore_empty,
            self.ignore_lines.clone(),
            self.chunk_size,
            in_place,
            self.failure_policy,
            self.atomic_output,
        )
    }

    fn get_rlimits() -> Result<(u64, u64), anyhow::Error> {
        getrlimit(Resource::NOFILE).with_context(|| "getrlimit")
    }

    fn set_rlimits(soft: u64, hard: u64) -> Result<(), anyhow::Error> {
        setrlimit(Resource::NOFILE, soft, hard)
            .with_context(|| format!("set rlimit NOFILE, soft: {}, hard: {}", soft, hard))?;
        Ok(())
    }

    /// Run `f` with the NOFILE soft limit raised to fit `files` open files, restoring it after
    fn with_raised_rlimit<T, F>(files: usize, f: F) -> Result<T, anyhow::Error>
        where F: FnOnce() -> Result<T, anyhow::Error> {
        let (current_soft, current_hard) = Self::get_rlimits()?;
        let new_soft = max((files + 256) as u64, current_soft).min(current_hard);
        if new_soft != current_soft {
            log::info!("Set new rlimit NOFILE, soft: {}, hard: {}", new_soft, current_hard);
            Self::set_rlimits(new_soft, current_hard)?;
        }
        let result = f();
        if new_soft != current_soft {
            log::info!("Restore rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
            return Self::keep_run_error(result, Self::set_rlimits(current_soft, current_hard));
        }
        result
    }

    /// A failed restore fails a successful run but does not replace the error of a failed run
    fn keep_run_error<T>(result: Result<T, anyhow::Error>, restored: Result<(), anyhow::Error>) -> Result<T, anyhow::Error> {
        match (result, restored) {
            (result, Ok(())) => result,
            (Ok(_), Err(restore_error)) => Err(restore_error),
            (Err(e), Err(restore_error)) => {
                log::error!("{:#}", restore_error);
                Err(e)
            }
        }
    }

    pub(crate) fn internal_check(path: &PathBuf, config: &Config) -> Result<bool, anyhow::Error> {
        let mut reader = config.record_reader(path)?;
        let mut previous: Option<LineRecord> = None;
        while let Some(current_line_record) = reader.next_record()? {
            if let Some(previous_line_record) = &previous {
                if previous_line_record > &current_line_record {
                    return Ok(false);
                }
            }
            previous = Some(current_line_record);
        }
        Ok(true)
    }

    /// k-way merge of sorted files. Returns the number of merged lines.
    pub(crate) fn internal_merge(files: &Vec<PathBuf>, config: &Config, output: &PathBuf) -> Result<usize, anyhow::Error> {
        log::info!(
            "Merging {} sorted files, key: {}, order: {:?}, thread: {}",
            files.len(),
            config.key(),
            config.order(),
            thread::current().name().unwrap_or("unnamed")
        );
        let mut unmerged_files: BinaryHeap<UnmergedChunkFile> = BinaryHeap::with_capacity(files.len());
        for (index, path) in files.iter().enumerate() {
            let unmerged_file = UnmergedChunkFile::new(index, path, config)?;
            if unmerged_file.head().is_some() {
                unmerged_files.push(unmerged_file);
            }
        }

        let field_separator = config.dialect().field_separator();
        let mut merged_len: usize = 0;
        let mut merged_writer = OutputFile::create(output, config.atomic_output())?;
        while let Some(mut current_min) = unmerged_files.pop() {
            // comparison operators are flipped to work with BinaryHeap (Max Heap)
            loop {
                match current_min.advance()
                    .with_context(|| anyhow!("merge input: {}", current_min.path().display()))? {
                    Some(line_record) => {
                        merged_writer.write_line(&line_record.encode(field_separator))?;
                        merged_len += 1;
                    }
                    None => break,
                }
                if current_min.head().is_none() {
                    break;
                }
                match unmerged_files.peek() {
                    Some(unmerged_min) if &current_min < unmerged_min => break,
                    _ => {}
                }
            }
            if current_min.head().is_some() {
                unmerged_files.push(current_min);
            }
        }
        merged_writer.commit()
            .with_context(|| anyhow!("merge output: {}", output.display()))?;
        log::info!("Finished merging sorted files, thread: {}, merged length: {} lines", thread::current().name().unwrap_or("unnamed"), merged_len);
        Ok(merged_len)
    }

    pub(crate) fn internal_sort_files(files: &Vec<PathBuf>, config: &Config) -> Result<SortReport, anyhow::Error> {
        log::info!("Start parallel sort of {} files, tasks: {}", files.len(), config.tasks());
        let shared_config = Arc::new(config.clone());
        let outcome = Arc::new(Mutex::new(BatchOutcome::default()));
        let abort = Arc::new(AtomicBool::new(false));

        let mut thread_pool_builder = ThreadPoolBuilder::new();
        let mut sorting_pool = thread_pool_builder
            .with_name("sorting".to_string())
            .with_tasks(config.tasks())
            .with_queue_size(config.queue_size())
            .with_shutdown_mode(ShutdownMode::CompletePending)
            .build()?;

        for (index, path) in files.iter().enumerate() {
            let sort_command = Box::new(
                SortCommand::new(index, path.clone(), shared_config.clone(), outcome.clone(), abort.clone())
            );
            sorting_pool.submit(sort_command);
        }

        log::info!("Shutting down sorting pool");
        sorting_pool.shutdown();
        sorting_pool.join()?;

        let BatchOutcome { mut sorted, failed } = std::mem::take(
            &mut *outcome.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
        );
        sorted.sort_by_key(|(index, _)| *index);

        if !failed.is_empty() && config.failure_policy() == FailurePolicy::Abort {
            let failed_count = failed.len();
            // failures are in completion order, the first one triggered the abort
            let (_, path, first) = failed.into_iter().next()
                .ok_or_else(|| anyhow!("failed chunk list is empty"))?;
            return Err(
                first.context(
                    Error::Batch {
                        failed: failed_count,
                        total: files.len(),
                        first: path,
                    }
                )
            );
        }

        let mut failed: Vec<(usize, PathBuf, String)> = failed.into_iter()
            .map(|(index, path, e)| (index, path, format!("{:#}", e)))
            .collect();
        failed.sort_by_key(|(index, _, _)| *index);
        log::info!("Finish parallel sort, sorted: {}, failed: {}", sorted.len(), failed.len());
        Ok(
            SortReport {
                sorted: sorted.into_iter().map(|(_, path)| path).collect(),
                failed: failed.into_iter().map(|(_, path, message)| (path, message)).collect(),
            }
        )
    }

    fn internal_sort(input_files: &Vec<PathBuf>, config: &Config, output: &PathBuf) -> Result<(), anyhow::Error> {
        log::info!(
            "Start disk sort of {} files into {}, key: {}, order: {:?}",
            input_files.len(),
            output.display(),
            config.key(),
            config.order()
        );
        let tmp_dir = tempfile::Builder::new()
            .prefix(config.tmp_prefix())
            .tempdir_in(config.tmp())
            .map_err(|e| Error::io(config.tmp(), e))?;

        let mut chunks = Vec::new();
        for (i, input) in input_files.iter().enumerate() {
            let mut split = Split::new(input.clone(), tmp_dir.path().join(format!("input-{}", i + 1)));
            split.with_has_header(config.has_header());
            split.with_line_terminator(config.dialect().line_terminator());
            split.with_chunk_size(config.chunk_size());
            let mut input_chunks = split.split()
                .with_context(|| anyhow!("split: {}", input.display()))?;
            chunks.append(&mut input_chunks);
        }

        let report = Self::internal_sort_files(&chunks, config)?;
        if !report.failed().is_empty() {
            log::warn!(
                "Skipping {} of {} chunks that failed to sort, their records are not in {}",
                report.failed().len(),
                chunks.len(),
                output.display()
            );
        }

        // sorted chunks end lines with '\n'
        let merge_config = config.with_dialect(config.dialect().clone().with_line_terminator(b"\n"));
        Self::with_raised_rlimit(report.sorted().len(), || Self::internal_merge(report.sorted(), &merge_config, output))?;

        let tmp_path = tmp_dir.path().to_path_buf();
        tmp_dir.close()
            .map_err(|e| Error::io(&tmp_path, e))?;
        log::info!("Finish disk sort");
        Ok(())
    }
}
