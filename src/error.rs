use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure categories attached to errors returned by this crate.
///
/// The public API returns [anyhow::Error] with context layers on top. Use [find] to get the
/// category:
/// ```
/// use disksort::error::{find, Error};
///
/// fn is_format_error(e: &anyhow::Error) -> bool {
///     matches!(find(e), Some(Error::Format { .. }))
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A file is missing, unreadable, unwritable or a destination cannot be created
    #[error("io error, path: {}, error: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A line does not contain the requested key field
    #[error("format error, path: {}, line: {}, {}", .path.display(), .line, .message)]
    Format {
        path: PathBuf,
        line: usize,
        message: String,
    },
    /// Join input is not ordered by its key
    #[error("precondition violation, path: {}, line: {}, {}", .path.display(), .line, .message)]
    Precondition {
        path: PathBuf,
        line: usize,
        message: String,
    },
    /// One or more chunk sort tasks failed
    #[error("{} of {} chunk sort tasks failed, first failed chunk: {}", .failed, .total, .first.display())]
    Batch {
        failed: usize,
        total: usize,
        first: PathBuf,
    },
}

impl Error {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Error {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Find the [Error] in the chain of `e`
pub fn find(e: &anyhow::Error) -> Option<&Error> {
    e.downcast_ref::<Error>()
        .or_else(|| e.chain().find_map(|cause| cause.downcast_ref::<Error>()))
}
