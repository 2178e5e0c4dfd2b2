use fwmap_header::HeaderError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mapping operations
pub type MappingResult<T> = std::result::Result<T, MappingError>;

/// Errors produced while generating or annotating mapping documents
#[derive(Error, Debug)]
pub enum MappingError {
    /// Reading the configuration header failed
    #[error(transparent)]
    Header(#[from] HeaderError),

    /// A required input file or directory does not exist
    #[error("Input not found: {0}")]
    MissingInput(PathBuf),

    /// A glob pattern matched nothing
    #[error("No files matching {pattern} in {dir}")]
    NoMatches { dir: PathBuf, pattern: String },

    /// Filesystem error outside header reading
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Existing mapping document is not valid JSON
    #[error("Malformed mapping document {path}: {source}")]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Existing mapping document parsed, but its root is not an object
    #[error("Mapping document {0} is not a JSON object")]
    NotAnObject(PathBuf),

    /// Static tables file could not be parsed
    #[error("Invalid tables file {path}: {source}")]
    InvalidTables {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Static tables parsed but are unusable
    #[error("Unusable tables {path}: {reason}")]
    TablesContent { path: PathBuf, reason: String },

    /// Glob pattern could not be compiled
    #[error("Invalid pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// JSON serialization of generated output failed
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MappingError {
    /// Create an Io error from a path and io::Error
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MappingError::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a TablesContent error
    pub fn tables(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        MappingError::TablesContent {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
