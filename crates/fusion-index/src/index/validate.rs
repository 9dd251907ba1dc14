//! Index/data consistency checks run when an index file is loaded.
//!
//! An index that disagrees with its data file in any way is rejected as a
//! whole; the caller is expected to rebuild it. Checks, in order:
//!
//! 1. No data file given and none next to the index: drop the EOF marker, accept.
//! 2. Explicit data file missing: [`IndexError::MissingFile`].
//! 3. Exactly one of data file and index empty: [`ConsistencyError::EmptyMismatch`].
//! 4. EOF marker present: its recorded size must equal the data file size.
//! 5. No marker: the last entry's header is read from the data file and the
//!    message must end exactly at the end of the file.

use crate::error::{ConsistencyError, IndexError, Result};
use crate::index::file_index::{data_path_for, IndexEntry, LoadOptions};
use crate::message::header::{MessageHeader, HEADER_SIZE};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

/// Removes a trailing EOF marker, returning the data file size it recorded.
pub(crate) fn strip_eof_marker(entries: &mut Vec<IndexEntry>) -> Option<u64> {
    match entries.last() {
        Some(last) if last.is_eof_marker() => {
            let size = last.offset;
            entries.pop();
            Some(size)
        }
        _ => None,
    }
}

/// Logs a consistency failure and, if requested, deletes the stale index file.
fn reject(index_path: &Path, delete_on_error: bool, err: ConsistencyError) -> IndexError {
    warn!("Index {} is inconsistent: {}", index_path.display(), err);
    if delete_on_error {
        match fs::remove_file(index_path) {
            Ok(()) => warn!("Deleted stale index {}", index_path.display()),
            Err(e) => warn!(
                "Failed to delete stale index {}: {:?}",
                index_path.display(),
                e
            ),
        }
    }
    err.into()
}

/// Validates decoded index entries against the data file.
///
/// On success, any EOF marker has been removed from `entries`.
pub(crate) fn check_consistency(
    index_path: &Path,
    entries: &mut Vec<IndexEntry>,
    options: &LoadOptions,
) -> Result<()> {
    let data_path = match &options.data_path {
        Some(path) => {
            if !path.exists() {
                return Err(IndexError::missing(path));
            }
            path.clone()
        }
        None => {
            let inferred = data_path_for(index_path);
            if !inferred.exists() {
                // Nothing to validate against.
                let marker = strip_eof_marker(entries);
                debug!(
                    "No data file for {}; skipping validation (marker={:?})",
                    index_path.display(),
                    marker
                );
                return Ok(());
            }
            inferred
        }
    };

    let mut data_file = File::open(&data_path)?;
    let data_size = data_file.metadata()?.len();
    let delete = options.delete_on_error;

    if data_size == 0 && !entries.is_empty() {
        return Err(reject(
            index_path,
            delete,
            ConsistencyError::EmptyMismatch {
                data_size,
                entries: entries.len(),
            },
        ));
    }
    if data_size != 0 && entries.is_empty() {
        return Err(reject(
            index_path,
            delete,
            ConsistencyError::EmptyMismatch {
                data_size,
                entries: 0,
            },
        ));
    }
    if entries.is_empty() {
        return Ok(());
    }

    if let Some(expected) = strip_eof_marker(entries) {
        if expected != data_size {
            return Err(reject(
                index_path,
                delete,
                ConsistencyError::SizeMismatch {
                    actual: data_size,
                    expected,
                },
            ));
        }
        return Ok(());
    }

    // No marker: infer the expected size from the last message's header.
    let last_offset = match entries.last() {
        Some(last) => last.offset,
        None => return Ok(()),
    };
    let header_fits = data_size
        .checked_sub(HEADER_SIZE as u64)
        .is_some_and(|limit| last_offset <= limit);
    if !header_fits {
        return Err(reject(
            index_path,
            delete,
            ConsistencyError::OffsetOutOfBounds {
                data_size,
                offset: last_offset,
            },
        ));
    }

    data_file.seek(SeekFrom::Start(last_offset))?;
    let mut buf = [0u8; HEADER_SIZE];
    data_file.read_exact(&mut buf)?;
    let header = MessageHeader::decode(&buf)?;

    let expected = last_offset + header.message_size();
    if expected != data_size {
        return Err(reject(
            index_path,
            delete,
            ConsistencyError::SizeMismatch {
                actual: data_size,
                expected,
            },
        ));
    }
    Ok(())
}
