use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for header operations
pub type HeaderResult<T> = std::result::Result<T, HeaderError>;

/// Errors that can occur while reading a configuration header
///
/// Scanning itself never fails: unbalanced directives and unmatched comment
/// patterns are absorbed. Only getting the bytes off disk can go wrong.
#[derive(Error, Debug)]
pub enum HeaderError {
    /// Header file does not exist
    #[error("Header not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read header file
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Header exceeds the configured size limit
    #[error("Header {path} exceeds maximum size of {max_size} bytes (actual: {actual_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        max_size: usize,
        actual_size: usize,
    },
}

impl HeaderError {
    /// Create an Io error from a path and io::Error
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HeaderError::Io {
            path: path.into(),
            source,
        }
    }

    /// Path of the header this error refers to
    pub fn path(&self) -> &PathBuf {
        match self {
            HeaderError::NotFound(path) => path,
            HeaderError::Io { path, .. } => path,
            HeaderError::FileTooLarge { path, .. } => path,
        }
    }
}
