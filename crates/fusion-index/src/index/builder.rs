//! Incremental construction of a [`FileIndex`] while decoding a data file.

use crate::error::Result;
use crate::index::file_index::{FileIndex, IndexEntry};
use crate::message::{FramedLogSource, MessageSource, MessageType};
use std::path::Path;
use tracing::debug;

/// Accumulates index entries in file order.
///
/// Entries are stored as appended; ordering is the caller's responsibility.
///
/// # Example
///
/// ```rust,ignore
/// use fusion_index::index::FileIndexBuilder;
///
/// let mut builder = FileIndexBuilder::new();
/// for message in reader {
///     let message = message?;
///     builder.append(message.message_type(), message.offset, message.p1_time);
/// }
/// let index = builder.save(&index_path, Some(&data_path))?;
/// ```
#[derive(Debug, Default)]
pub struct FileIndexBuilder {
    entries: Vec<IndexEntry>,
}

impl FileIndexBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty builder with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Scans `data_path` with the default framed reader and returns its index.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub fn from_file(data_path: &Path) -> Result<FileIndex> {
        let source: FramedLogSource = FramedLogSource::default();
        Self::from_source(&source, data_path)
    }

    /// Scans `data_path` with `source`, ignoring any existing index, and
    /// returns the resulting index.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by the message stream.
    pub fn from_source<S: MessageSource>(source: &S, data_path: &Path) -> Result<FileIndex> {
        let mut builder = Self::new();
        for message in source.open(data_path, true)? {
            let message = message?;
            builder.append(message.message_type(), message.offset, message.p1_time);
        }
        debug!(
            "Indexed {} messages from {}",
            builder.len(),
            data_path.display()
        );
        Ok(builder.finish())
    }

    /// Adds an entry. Use `None` for messages without P1 time.
    pub fn append(&mut self, message_type: MessageType, offset: u64, p1_time: Option<f64>) {
        let time = p1_time.unwrap_or(f64::NAN);
        self.entries.push(IndexEntry::new(time, message_type, offset));
    }

    /// Returns the number of accumulated entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries have been appended.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the builder and returns the index.
    pub fn finish(self) -> FileIndex {
        FileIndex::from_entries(self.entries)
    }

    /// Consumes the builder, saves the index and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the index file cannot be written or `data_path`
    /// does not exist.
    pub fn save(self, index_path: &Path, data_path: Option<&Path>) -> Result<FileIndex> {
        let index = self.finish();
        index.save(index_path, data_path)?;
        Ok(index)
    }
}

impl Extend<(MessageType, u64, Option<f64>)> for FileIndexBuilder {
    fn extend<I: IntoIterator<Item = (MessageType, u64, Option<f64>)>>(&mut self, iter: I) {
        for (message_type, offset, p1_time) in iter {
            self.append(message_type, offset, p1_time);
        }
    }
}
