use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tempfile::NamedTempFile;

use crate::error::Error;

/// A line oriented output. Atomic outputs are written to a temporary file next to the target
/// and renamed over it on [OutputFile::commit]. Dropping an uncommitted atomic output removes
/// the temporary file and leaves the target untouched.
pub(crate) enum OutputFile {
    Atomic {
        path: PathBuf,
        writer: BufWriter<NamedTempFile>,
    },
    Direct {
        path: PathBuf,
        writer: BufWriter<File>,
    },
}

impl OutputFile {
    pub(crate) fn create(path: &PathBuf, atomic: bool) -> Result<OutputFile, anyhow::Error> {
        if atomic {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let tmp = NamedTempFile::new_in(&dir)
                .map_err(|e| Error::io(&dir, e))?;
            Ok(
                OutputFile::Atomic {
                    path: path.clone(),
                    writer: BufWriter::new(tmp),
                }
            )
        } else {
            let file = File::create(path)
                .map_err(|e| Error::io(path, e))?;
            Ok(
                OutputFile::Direct {
                    path: path.clone(),
                    writer: BufWriter::new(file),
                }
            )
        }
    }

    pub(crate) fn path(&self) -> &Path {
        match self {
            OutputFile::Atomic { path, .. } => path,
            OutputFile::Direct { path, .. } => path,
        }
    }

    /// Write `line` followed by a single '\n'
    pub(crate) fn write_line(&mut self, line: &str) -> Result<(), anyhow::Error> {
        let result = match self {
            OutputFile::Atomic { writer, .. } => {
                writer.write_all(line.as_bytes()).and_then(|_| writer.write_all(b"\n"))
            }
            OutputFile::Direct { writer, .. } => {
                writer.write_all(line.as_bytes()).and_then(|_| writer.write_all(b"\n"))
            }
        };
        result.map_err(|e| Error::io(self.path(), e))?;
        Ok(())
    }

    pub(crate) fn commit(self) -> Result<(), anyhow::Error> {
        match self {
            OutputFile::Atomic { path, writer } => {
                let tmp = writer.into_inner()
                    .map_err(|e| Error::io(&path, e.into_error()))?;
                tmp.persist(&path)
                    .map_err(|e| Error::io(&path, e.error))
                    .with_context(|| format!("persist output: {}", path.display()))?;
            }
            OutputFile::Direct { path, mut writer } => {
                writer.flush()
                    .map_err(|e| Error::io(&path, e))?;
            }
        }
        Ok(())
    }
}
