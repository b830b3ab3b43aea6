use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{anyhow, Context};
use command_executor::command::Command;

use crate::config::{Config, FailurePolicy};
use crate::line_record::LineRecord;
use crate::output_file::OutputFile;

/// Results of a batch of [SortCommand]s, keyed by the chunk index in the batch
#[derive(Default)]
pub(crate) struct BatchOutcome {
    pub(crate) sorted: Vec<(usize, PathBuf)>,
    pub(crate) failed: Vec<(usize, PathBuf, anyhow::Error)>,
}

/// Sorts one chunk file in memory and writes it back in place or next to it.
pub(crate) struct SortCommand {
    index: usize,
    path: PathBuf,
    config: Arc<Config>,
    outcome: Arc<Mutex<BatchOutcome>>,
    abort: Arc<AtomicBool>,
}

impl SortCommand {
    pub(crate) fn new(
        index: usize,
        path: PathBuf,
        config: Arc<Config>,
        outcome: Arc<Mutex<BatchOutcome>>,
        abort: Arc<AtomicBool>,
    ) -> SortCommand {
        SortCommand {
            index,
            path,
            config,
            outcome,
            abort,
        }
    }

    pub(crate) fn sorted_path(path: &PathBuf, in_place: bool) -> PathBuf {
        if in_place {
            path.clone()
        } else {
            let mut sorted = path.as_os_str().to_os_string();
            sorted.push("-sorted");
            PathBuf::from(sorted)
        }
    }

    fn read_records(&self) -> Result<Vec<LineRecord>, anyhow::Error> {
        let mut reader = self.config.record_reader(&self.path)?;
        let mut line_records = Vec::new();
        while let Some(line_record) = reader.next_record()? {
            line_records.push(line_record);
        }
        Ok(line_records)
    }

    fn sort_chunk(&self) -> Result<PathBuf, anyhow::Error> {
        let mut chunk = self.read_records()?;
        // stable, equal keys keep their order within the chunk
        chunk.sort();

        let target = Self::sorted_path(&self.path, self.config.in_place());
        let mut output = OutputFile::create(&target, self.config.atomic_output())?;
        let field_separator = self.config.dialect().field_separator();
        for line_record in &chunk {
            output.write_line(&line_record.encode(field_separator))?;
        }
        output.commit()?;
        log::debug!(
            "Sorted chunk {}, {} records, thread: {}",
            self.path.display(),
            chunk.len(),
            thread::current().name().unwrap_or("unnamed")
        );
        Ok(target)
    }
}

impl Command for SortCommand {
    fn execute(&self) -> Result<(), anyhow::Error> {
        if self.abort.load(Ordering::SeqCst) {
            log::debug!("Batch aborted, skip chunk {}", self.path.display());
            return Ok(());
        }

        let result = self.sort_chunk()
            .with_context(|| anyhow!("sort chunk: {}", self.path.display()));
        let mut outcome = self.outcome.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match result {
            Ok(target) => {
                outcome.sorted.push((self.index, target));
            }
            Err(e) => {
                log::error!("{:#}, thread: {}", e, thread::current().name().unwrap_or("unnamed"));
                if self.config.failure_policy() == FailurePolicy::Abort {
                    self.abort.store(true, Ordering::SeqCst);
                }
                // failures are collected for the batch, the pool only sees success
                outcome.failed.push((self.index, self.path.clone(), e));
            }
        }
        Ok(())
    }
}
