//! In-memory FusionEngine message index.
//!
//! A [`FileIndex`] lists the P1 time, message type and byte offset of every
//! message in a `.p1log` data file, in file order. It is loaded from (and
//! saved to) a `.p1i` file of fixed-width records (see [`crate::index::record`]),
//! and answers type, time and position queries so readers can seek straight
//! to the messages they need.
//!
//! All queries return a new [`FileIndex`]; an index never changes after
//! construction.
//!
//! # Example
//!
//! ```rust,ignore
//! use fusion_index::index::{FileIndex, LoadOptions, NanHint};
//! use fusion_index::message::MessageType;
//!
//! let index = FileIndex::load(&index_path, &LoadOptions::default())?;
//!
//! // Every pose message between P1 time 100 and 110.
//! let poses = index
//!     .by_type(MessageType::POSE)
//!     .by_time_range(Some(100.0), Some(110.0), NanHint::RemoveNans)?;
//!
//! for entry in &poses {
//!     data_file.seek(SeekFrom::Start(entry.offset))?;
//!     // ...
//! }
//! ```

use crate::error::{IndexError, Result};
use crate::index::record::{decode_records, RawRecord};
use crate::index::time_range::{NanHint, TimeRange};
use crate::index::validate;
use crate::message::MessageType;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::iter::FusedIterator;
use std::ops::{Bound, RangeBounds};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File extension of index files.
pub const INDEX_EXTENSION: &str = "p1i";

/// File extension of FusionEngine data files.
pub const DATA_EXTENSION: &str = "p1log";

/// Returns the index file path for a data file (`log.p1log` → `log.p1i`).
pub fn index_path_for(data_path: &Path) -> PathBuf {
    data_path.with_extension(INDEX_EXTENSION)
}

/// Returns the data file path implied by an index file (`log.p1i` → `log.p1log`).
pub fn data_path_for(index_path: &Path) -> PathBuf {
    index_path.with_extension(DATA_EXTENSION)
}

/// One message in the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexEntry {
    /// P1 time in seconds, or NaN if the message has no P1 time.
    pub time: f64,
    /// Message type.
    pub message_type: MessageType,
    /// Offset of the message header in the data file.
    pub offset: u64,
}

impl IndexEntry {
    /// Creates an entry. Use `f64::NAN` for messages without P1 time.
    pub fn new(time: f64, message_type: MessageType, offset: u64) -> Self {
        Self {
            time,
            message_type,
            offset,
        }
    }

    /// Creates the end-of-file marker recording the data file size.
    pub fn eof_marker(data_file_size: u64) -> Self {
        Self::new(f64::NAN, MessageType::INVALID, data_file_size)
    }

    /// Returns true if this is an end-of-file marker.
    pub fn is_eof_marker(&self) -> bool {
        self.message_type == MessageType::INVALID
    }

    /// Returns the P1 time, or `None` if the message has none.
    pub fn p1_time(&self) -> Option<f64> {
        if self.time.is_nan() {
            None
        } else {
            Some(self.time)
        }
    }
}

/// Options for loading an index file.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Data file to validate against. If `None`, the `.p1log` file next to the
    /// index is used when it exists; otherwise validation is skipped.
    pub data_path: Option<PathBuf>,
    /// Delete the index file when it is found to be inconsistent with the data.
    pub delete_on_error: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            data_path: None,
            delete_on_error: true,
        }
    }
}

impl LoadOptions {
    /// Sets the data file to validate against.
    pub fn with_data_path(mut self, data_path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(data_path.into());
        self
    }

    /// Sets whether an inconsistent index file is deleted.
    pub fn with_delete_on_error(mut self, delete_on_error: bool) -> Self {
        self.delete_on_error = delete_on_error;
        self
    }
}

/// Index of the messages in a FusionEngine data file.
///
/// Entries are stored as three parallel columns in file order.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    time: Vec<f64>,
    types: Vec<MessageType>,
    offset: Vec<u64>,
    t0: Option<f64>,
}

impl FileIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index from entries in file order.
    ///
    /// No validation against a data file is performed.
    pub fn from_entries(entries: Vec<IndexEntry>) -> Self {
        Self::with_t0(entries, None)
    }

    /// Creates an index from entries with an explicit reference time.
    ///
    /// If `t0` is `None`, the time of the first entry with a valid time is used.
    pub fn with_t0(entries: Vec<IndexEntry>, t0: Option<f64>) -> Self {
        let mut index = Self {
            time: Vec::with_capacity(entries.len()),
            types: Vec::with_capacity(entries.len()),
            offset: Vec::with_capacity(entries.len()),
            t0: None,
        };
        for entry in entries {
            index.time.push(entry.time);
            index.types.push(entry.message_type);
            index.offset.push(entry.offset);
        }
        index.t0 = t0.or_else(|| index.time.iter().copied().find(|t| !t.is_nan()));
        index
    }

    /// Decodes an index from raw `.p1i` file contents.
    ///
    /// A trailing end-of-file marker is removed. No validation against a
    /// data file is performed.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Format` if the buffer is not a whole number of records.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut entries = decode_records(buf)?;
        validate::strip_eof_marker(&mut entries);
        Ok(Self::from_entries(entries))
    }

    /// Loads a `.p1i` index file and validates it against its data file.
    ///
    /// # Errors
    ///
    /// - `IndexError::MissingFile` if the index file, or an explicitly
    ///   specified data file, does not exist.
    /// - `IndexError::Format` if the file is not a whole number of records or
    ///   the last message header in the data file cannot be decoded.
    /// - `IndexError::Consistency` if the index does not match the data file.
    pub fn load(index_path: &Path, options: &LoadOptions) -> Result<Self> {
        if !index_path.exists() {
            return Err(IndexError::missing(index_path));
        }

        let buf = fs::read(index_path)?;
        let mut entries = decode_records(&buf)?;
        validate::check_consistency(index_path, &mut entries, options)?;

        debug!(
            "Loaded {} index entries from {}",
            entries.len(),
            index_path.display()
        );
        Ok(Self::from_entries(entries))
    }

    /// Saves the index as a `.p1i` file, replacing any existing file.
    ///
    /// If `data_path` is given and the index is non-empty, an end-of-file
    /// marker recording the current data file size is appended so a later
    /// load can detect a changed data file.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::MissingFile` if `data_path` does not exist, or an
    /// I/O error if writing fails.
    pub fn save(&self, index_path: &Path, data_path: Option<&Path>) -> Result<()> {
        let mut entries: Vec<IndexEntry> = self.iter().collect();

        let needs_marker = entries.last().is_some_and(|last| !last.is_eof_marker());
        if let Some(data_path) = data_path {
            if needs_marker {
                let metadata = fs::metadata(data_path).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        IndexError::missing(data_path)
                    } else {
                        e.into()
                    }
                })?;
                entries.push(IndexEntry::eof_marker(metadata.len()));
            }
        }

        // Write to a sibling file, then rename over the target.
        let mut tmp_name = OsString::from(index_path.as_os_str());
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        if let Err(e) = write_records(&tmp_path, &entries)
            .and_then(|()| fs::rename(&tmp_path, index_path).map_err(IndexError::from))
        {
            if let Err(remove_err) = fs::remove_file(&tmp_path) {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        "Failed to remove partial index {}: {:?}",
                        tmp_path.display(),
                        remove_err
                    );
                }
            }
            return Err(e);
        }

        debug!(
            "Saved {} index records to {}",
            entries.len(),
            index_path.display()
        );
        Ok(())
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Returns true if the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Returns the P1 time of the first entry with a valid time.
    pub fn t0(&self) -> Option<f64> {
        self.t0
    }

    /// P1 times in seconds; NaN for messages without P1 time.
    pub fn times(&self) -> &[f64] {
        &self.time
    }

    /// Message types.
    pub fn types(&self) -> &[MessageType] {
        &self.types
    }

    /// Byte offsets into the data file.
    pub fn offsets(&self) -> &[u64] {
        &self.offset
    }

    /// Returns the entry at `position`.
    pub fn get(&self, position: usize) -> Option<IndexEntry> {
        if position < self.len() {
            Some(self.entry(position))
        } else {
            None
        }
    }

    /// Returns an iterator over the entries in file order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            index: self,
            front: 0,
            back: self.len(),
        }
    }

    fn entry(&self, position: usize) -> IndexEntry {
        IndexEntry {
            time: self.time[position],
            message_type: self.types[position],
            offset: self.offset[position],
        }
    }

    /// Copies the entries at `positions` into a new index sharing this index's `t0`.
    fn gather<I>(&self, positions: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut result = Self {
            time: Vec::new(),
            types: Vec::new(),
            offset: Vec::new(),
            t0: self.t0,
        };
        for i in positions {
            result.time.push(self.time[i]);
            result.types.push(self.types[i]);
            result.offset.push(self.offset[i]);
        }
        result
    }

    fn empty_like(&self) -> Self {
        Self {
            t0: self.t0,
            ..Self::default()
        }
    }

    /// Returns the entries of a single message type.
    pub fn by_type(&self, message_type: MessageType) -> Self {
        self.by_types(&[message_type])
    }

    /// Returns the entries whose type is any of `message_types`.
    pub fn by_types(&self, message_types: &[MessageType]) -> Self {
        self.gather((0..self.len()).filter(|&i| message_types.contains(&self.types[i])))
    }

    /// Returns the entries in the time range `[start, stop)`.
    ///
    /// Either bound may be omitted. The index stores whole seconds only, so
    /// `start` is floored before matching and sub-second boundaries are not
    /// honored exactly.
    ///
    /// The range is located positionally: it runs from the first entry with
    /// time `>= floor(start)` up to (not including) the first entry with time
    /// `>= stop`. `hint` decides what happens to entries without a time; with
    /// [`NanHint::IncludeNans`] any such entries between those two positions
    /// are returned, wherever they fall relative to the interval.
    ///
    /// # Errors
    ///
    /// Never fails for a valid [`NanHint`]; the `Result` matches the other
    /// time-based queries.
    pub fn by_time_range(&self, start: Option<f64>, stop: Option<f64>, hint: NanHint) -> Result<Self> {
        if self.is_empty() {
            return Ok(self.empty_like());
        }

        let start_idx = start.map_or(0, |s| self.first_at_or_after(s.floor()));
        let end_idx = stop.map_or(self.len(), |s| self.first_at_or_after(s));
        let end_idx = end_idx.max(start_idx);
        let in_range = |i: usize| i >= start_idx && i < end_idx;

        let result = match hint {
            NanHint::IncludeNans => self.gather(start_idx..end_idx),
            NanHint::AllNans => {
                self.gather((0..self.len()).filter(|&i| in_range(i) || self.time[i].is_nan()))
            }
            NanHint::RemoveNans => {
                self.gather((start_idx..end_idx).filter(|&i| !self.time[i].is_nan()))
            }
        };
        Ok(result)
    }

    /// Like [`FileIndex::by_time_range`], with the hint given by name
    /// (`include_nans`, `all_nans` or `remove_nans`).
    ///
    /// # Errors
    ///
    /// Returns `IndexError::InvalidArgument` for an unrecognized hint on a
    /// non-empty index.
    pub fn by_time_range_hint(&self, start: Option<f64>, stop: Option<f64>, hint: &str) -> Result<Self> {
        if self.is_empty() {
            return Ok(self.empty_like());
        }
        let hint: NanHint = hint.parse()?;
        self.by_time_range(start, stop, hint)
    }

    /// Returns the entries inside a [`TimeRange`], keeping NaN entries positionally.
    ///
    /// Relative ranges are resolved against `range.p1_t0`, or this index's
    /// `t0` if that is not set.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::InvalidArgument` if a relative range has no
    /// reference time to resolve against.
    pub fn by_time_range_descriptor(&self, range: &TimeRange) -> Result<Self> {
        if self.is_empty() {
            return Ok(self.empty_like());
        }
        let (start, stop) = range.resolve(self.t0)?;
        self.by_time_range(start, stop, NanHint::IncludeNans)
    }

    /// Returns a one-entry index holding the entry at `position`.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::InvalidArgument` if `position` is out of range
    /// for a non-empty index.
    pub fn by_position(&self, position: usize) -> Result<Self> {
        if self.is_empty() {
            return Ok(self.empty_like());
        }
        if position >= self.len() {
            return Err(IndexError::InvalidArgument(format!(
                "Position {} out of range for index of {} entries",
                position,
                self.len()
            )));
        }
        Ok(self.gather(position..position + 1))
    }

    /// Returns the contiguous entries in `range`.
    ///
    /// Bounds past the end are clamped to the index length, as with slicing.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::InvalidArgument` if the range starts after it ends.
    pub fn by_range<R: RangeBounds<usize>>(&self, range: R) -> Result<Self> {
        if self.is_empty() {
            return Ok(self.empty_like());
        }

        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => self.len(),
        };
        if start > end {
            return Err(IndexError::InvalidArgument(format!(
                "Range start {} is after range end {}",
                start, end
            )));
        }

        let end = end.min(self.len());
        let start = start.min(end);
        Ok(self.gather(start..end))
    }

    /// Returns the entries at `positions`, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::InvalidArgument` if any position is out of range
    /// for a non-empty index.
    pub fn by_positions(&self, positions: &[usize]) -> Result<Self> {
        if self.is_empty() {
            return Ok(self.empty_like());
        }
        if let Some(&bad) = positions.iter().find(|&&p| p >= self.len()) {
            return Err(IndexError::InvalidArgument(format!(
                "Position {} out of range for index of {} entries",
                bad,
                self.len()
            )));
        }
        Ok(self.gather(positions.iter().copied()))
    }

    /// Position of the first entry whose time is `>= bound`, or `len()` if none.
    ///
    /// NaN times never match.
    fn first_at_or_after(&self, bound: f64) -> usize {
        self.time
            .iter()
            .position(|&t| t >= bound)
            .unwrap_or(self.len())
    }
}

/// Writes `entries` as raw records to a new file at `path` and syncs it.
fn write_records(path: &Path, entries: &[IndexEntry]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for entry in entries {
        RawRecord::from_entry(entry).write_to(&mut writer)?;
    }
    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    file.sync_all()?;
    Ok(())
}

/// Iterator over the entries of a [`FileIndex`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    index: &'a FileIndex,
    front: usize,
    back: usize,
}

impl Iterator for Iter<'_> {
    type Item = IndexEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let entry = self.index.entry(self.front);
        self.front += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.index.entry(self.back))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a FileIndex {
    type Item = IndexEntry;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<IndexEntry> for FileIndex {
    fn from_iter<I: IntoIterator<Item = IndexEntry>>(iter: I) -> Self {
        Self::from_entries(iter.into_iter().collect())
    }
}
