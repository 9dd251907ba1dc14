//! Error and Result types for FusionEngine index operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A convenience `Result` type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// The error type for index and log operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A referenced index file or explicitly specified data file does not exist.
    #[error("File not found: {}", path.display())]
    MissingFile {
        /// Path that was expected to exist.
        path: PathBuf,
    },

    /// The index and its companion data file disagree.
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    /// Unsupported query shape or unrecognized argument value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed index buffer or message header.
    #[error("Format error: {0}")]
    Format(String),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl IndexError {
    /// Returns true if this error reports an index/data disagreement.
    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::Consistency(_))
    }

    /// Creates a [`IndexError::MissingFile`] for the given path.
    pub(crate) fn missing(path: impl Into<PathBuf>) -> Self {
        Self::MissingFile { path: path.into() }
    }
}

/// Index/data divergence detected while loading an index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    /// Exactly one of the index and the data file is empty.
    #[error("Index/data emptiness mismatch: data file is {data_size} B, index has {entries} entries")]
    EmptyMismatch {
        /// Observed size of the data file in bytes.
        data_size: u64,
        /// Number of entries in the index.
        entries: usize,
    },

    /// The data file size differs from the size recorded or implied by the index.
    #[error("Size expected by index does not match data file: size={actual} B, expected={expected} B")]
    SizeMismatch {
        /// Observed size of the data file in bytes.
        actual: u64,
        /// Size expected from the index contents.
        expected: u64,
    },

    /// The last index entry points past the last possible message header in the data file.
    #[error("Last index entry past end of file: size={data_size} B, start_offset={offset} B")]
    OffsetOutOfBounds {
        /// Observed size of the data file in bytes.
        data_size: u64,
        /// Offset of the last index entry.
        offset: u64,
    },
}
