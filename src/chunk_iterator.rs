use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use anyhow::{anyhow, Context};

use crate::dialect::line_end_marker;
use crate::error::Error;

const SCAN_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Chunk {
    offset: u64,
    length: u64,
    path: PathBuf,
}

impl Chunk {
    pub(crate) fn new(offset: u64, length: u64, path: PathBuf) -> Chunk {
        Chunk {
            offset,
            length,
            path,
        }
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    pub(crate) fn length(&self) -> u64 {
        self.length
    }

    pub(crate) fn path(&self) -> &PathBuf {
        &self.path
    }
}

/// Iterates over line aligned byte ranges of a file.
///
/// Each chunk starts where the previous one ended and extends `jump` bytes plus the remainder
/// of the line crossing that mark, terminator included. The first chunk starts after the header
/// line when there is one.
pub(crate) struct ChunkIterator {
    path: PathBuf,
    file: File,
    length: u64,
    jump: u64,
    pos: u64,
    terminator: Vec<u8>,
    emitted: usize,
    done: bool,
}

impl ChunkIterator {
    pub(crate) fn new(path: &PathBuf, jump: u64, terminator: &[u8], has_header: bool) -> Result<ChunkIterator, anyhow::Error> {
        let metadata = path.metadata()
            .map_err(|e| Error::io(path, e))?;
        let length = metadata.len();
        let file = File::open(path)
            .map_err(|e| Error::io(path, e))?;

        let mut chunk_iterator = ChunkIterator {
            path: path.clone(),
            file,
            length,
            jump: jump.max(1),
            pos: 0,
            terminator: line_end_marker(terminator).to_vec(),
            emitted: 0,
            done: false,
        };

        if has_header {
            // a file without any terminator is all header
            chunk_iterator.pos = chunk_iterator.line_end_after(0)?.unwrap_or(length);
            log::debug!("Skipped header of {} bytes, path: {}", chunk_iterator.pos, path.display());
        }
        Ok(chunk_iterator)
    }

    /// Absolute position just past the first terminator starting at or after `offset`, None when
    /// the file ends first.
    fn line_end_after(&mut self, offset: u64) -> Result<Option<u64>, anyhow::Error> {
        self.file.seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io(&self.path, e))
            .with_context(|| anyhow!("seek to: {}", offset))?;

        let mut scan = vec![0 as u8; SCAN_BUFFER_SIZE];
        let mut pending: Vec<u8> = Vec::new();
        let mut pending_start = offset;
        loop {
            let n = self.file.read(&mut scan)
                .map_err(|e| Error::io(&self.path, e))
                .with_context(|| anyhow!("read at: {}", pending_start + pending.len() as u64))?;
            if n == 0 {
                return Ok(None);
            }
            pending.extend_from_slice(&scan[..n]);

            if let Some(i) = find(&pending, &self.terminator) {
                return Ok(Some(pending_start + (i + self.terminator.len()) as u64));
            }

            // keep a possible terminator prefix that straddles two reads
            let keep = pending.len().min(self.terminator.len() - 1);
            let consumed = pending.len() - keep;
            pending.drain(..consumed);
            pending_start += consumed as u64;
        }
    }

    fn next_chunk(&mut self) -> Result<Option<Chunk>, anyhow::Error> {
        if self.done {
            return Ok(None);
        }

        if self.pos >= self.length && self.emitted > 0 {
            self.done = true;
            return Ok(None);
        }

        let end = if self.pos + self.jump >= self.length {
            self.length
        } else {
            self.line_end_after(self.pos + self.jump)?.unwrap_or(self.length)
        };

        let chunk = Chunk::new(self.pos, end - self.pos, self.path.clone());
        self.pos = end;
        self.emitted += 1;
        if end >= self.length {
            self.done = true;
        }
        Ok(Some(chunk))
    }
}

impl Iterator for ChunkIterator {
    type Item = Result<Chunk, anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
