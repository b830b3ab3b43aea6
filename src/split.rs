use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use regex::{Captures, Regex};

use crate::chunk_iterator::{Chunk, ChunkIterator};
use crate::error::Error;

/// Chunk sizing policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkSize {
    /// Chunks of about this many bytes, extended to the end of the line crossing the mark
    Bytes(u64),
    /// About this many chunks, each sized `file size / count` bytes
    Count(usize),
}

impl ChunkSize {
    pub(crate) fn bytes_for(&self, file_size: u64) -> u64 {
        match self {
            ChunkSize::Bytes(bytes) => (*bytes).max(1),
            ChunkSize::Count(count) => (file_size / (*count).max(1) as u64).max(1),
        }
    }
}

/// Split a file into line aligned chunk files
///
/// No line is ever split between two chunks and concatenating the chunks in order reproduces the
/// input, except for the header line which, when present, is dropped.
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use disksort::split::{ChunkSize, Split};
///
/// fn split_in_four(input: PathBuf, dest: PathBuf) -> Result<Vec<PathBuf>, anyhow::Error> {
///     let mut split = Split::new(input, dest);
///     split.with_chunk_size(ChunkSize::Count(4));
///     split.with_line_terminator(b"\n");
///     split.split()
/// }
/// ```
pub struct Split {
    input: PathBuf,
    dest: PathBuf,
    has_header: bool,
    line_terminator: Vec<u8>,
    chunk_size: ChunkSize,
    naming_template: String,
}

impl Split {
    /// Create a default Split definition.
    ///
    /// * the first line is a header
    /// * the line terminator is CRLF
    /// * chunks are 64 MiB
    /// * chunk files are named `part_{i:03}` followed by the input file extension
    pub fn new(input: PathBuf, dest: PathBuf) -> Split {
        Split {
            input,
            dest,
            has_header: true,
            line_terminator: b"\r\n".to_vec(),
            chunk_size: ChunkSize::Bytes(64 * 1024 * 1024),
            naming_template: "part_{i:03}".to_string(),
        }
    }

    /// Specify whether the first line is a header to be dropped. The default is true
    pub fn with_has_header(&mut self, has_header: bool) {
        self.has_header = has_header;
    }

    /// Set the line terminator. The default is CRLF
    pub fn with_line_terminator(&mut self, line_terminator: &[u8]) {
        self.line_terminator = line_terminator.to_vec();
    }

    /// Set the chunk sizing policy. The default is 64 MiB chunks
    pub fn with_chunk_size(&mut self, chunk_size: ChunkSize) {
        self.chunk_size = chunk_size;
    }

    /// Set the chunk file name template. `{i}` is replaced by the chunk index starting at 1,
    /// `{i:0N}` by the index zero padded to N digits.
    pub fn with_naming_template(&mut self, naming_template: &str) {
        self.naming_template = naming_template.to_string();
    }

    /// Write the chunk files and return their paths in input order
    pub fn split(&self) -> Result<Vec<PathBuf>, anyhow::Error> {
        log::info!("Splitting {} into {}", self.input.display(), self.dest.display());
        let naming = ChunkNaming::new(&self.naming_template, &self.input)?;
        let file_size = self.input.metadata()
            .map_err(|e| Error::io(&self.input, e))?
            .len();
        if !self.dest.exists() {
            std::fs::create_dir_all(&self.dest)
                .map_err(|e| Error::io(&self.dest, e))?;
        }

        let jump = self.chunk_size.bytes_for(file_size);
        let mut source = File::open(&self.input)
            .map_err(|e| Error::io(&self.input, e))?;

        let mut files = Vec::new();
        for (i, chunk) in ChunkIterator::new(&self.input, jump, &self.line_terminator, self.has_header)?.enumerate() {
            let chunk = chunk?;
            let path = self.dest.join(naming.file_name(i + 1));
            Self::write_chunk(&mut source, &chunk, &path)
                .with_context(|| anyhow!("chunk offset: {}, length: {}", chunk.offset(), chunk.length()))?;
            files.push(path);
        }
        log::info!("Split {} into {} chunks of about {} bytes", self.input.display(), files.len(), jump);
        Ok(files)
    }

    fn write_chunk(source: &mut File, chunk: &Chunk, path: &PathBuf) -> Result<(), anyhow::Error> {
        source.seek(SeekFrom::Start(chunk.offset()))
            .map_err(|e| Error::io(chunk.path(), e))?;
        let mut writer = BufWriter::new(
            File::create(path).map_err(|e| Error::io(path, e))?
        );
        let mut limited = Read::take(&mut *source, chunk.length());
        let copied = std::io::copy(&mut limited, &mut writer)
            .map_err(|e| Error::io(path, e))?;
        if copied != chunk.length() {
            return Err(
                anyhow!(
                    "short copy from {}, expected {} bytes, copied {}",
                    chunk.path().display(),
                    chunk.length(),
                    copied
                )
            );
        }
        writer.flush().map_err(|e| Error::io(path, e))?;
        Ok(())
    }
}

pub(crate) struct ChunkNaming {
    template: String,
    placeholder: Regex,
    extension: String,
}

impl ChunkNaming {
    pub(crate) fn new(template: &str, input: &PathBuf) -> Result<ChunkNaming, anyhow::Error> {
        let placeholder = Regex::new(r"\{i(?::0?(\d+))?\}")?;
        if !placeholder.is_match(template) {
            return Err(anyhow!("chunk naming template '{}' has no {{i}} placeholder", template));
        }
        let extension = match input.extension() {
            Some(extension) => format!(".{}", extension.to_string_lossy()),
            None => String::new(),
        };
        Ok(
            ChunkNaming {
                template: template.to_string(),
                placeholder,
                extension,
            }
        )
    }

    pub(crate) fn file_name(&self, index: usize) -> String {
        let name = self.placeholder.replace_all(
            &self.template,
            |captures: &Captures| {
                match captures.get(1) {
                    Some(width) => {
                        let width = width.as_str().parse::<usize>().unwrap_or(0);
                        format!("{:0width$}", index, width = width)
                    }
                    None => index.to_string(),
                }
            },
        );
        format!("{}{}", name, self.extension)
    }
}
