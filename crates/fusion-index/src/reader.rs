//! Index-backed access to a FusionEngine data file.
//!
//! [`IndexedLog`] owns the policy for obtaining a usable index: load the
//! `.p1i` file next to the data file, and if it is missing or fails
//! validation, regenerate it by scanning the data file, save it for next
//! time, and carry on. Messages are then read by seeking straight to the
//! offsets of the index entries of interest.

use crate::error::{IndexError, Result};
use crate::index::{index_path_for, FileIndex, FileIndexBuilder, IndexEntry, LoadOptions};
use crate::message::{
    read_message_at, FramedLogConfig, FramedLogSource, LeadingP1Time, LogMessage, P1TimeDecoder,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration for [`IndexedLog`].
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Always regenerate the index instead of loading an existing one.
    pub ignore_index: bool,
    /// Save a regenerated index next to the data file.
    pub save_index: bool,
    /// Delete an existing index file that fails validation.
    pub delete_on_error: bool,
    /// Check message CRCs when scanning and reading.
    pub validate_crc: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            ignore_index: false,
            save_index: true,
            delete_on_error: true,
            validate_crc: true,
        }
    }
}

/// A data file paired with a validated index.
pub struct IndexedLog<D = LeadingP1Time> {
    data_path: PathBuf,
    index_path: PathBuf,
    index: FileIndex,
    rebuilt: bool,
    file: BufReader<File>,
    decoder: D,
    validate_crc: bool,
}

impl IndexedLog {
    /// Opens a data file with the default configuration and P1 time decoder.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::MissingFile` if the data file does not exist, or
    /// an error if the data file cannot be scanned.
    pub fn open(data_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(data_path, ReaderConfig::default(), LeadingP1Time::default())
    }
}

impl<D: P1TimeDecoder + Clone> IndexedLog<D> {
    /// Opens a data file, loading or regenerating its index.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::MissingFile` if the data file does not exist, or
    /// an error if the data file cannot be scanned. Problems with an existing
    /// index file are logged and resolved by regenerating it.
    pub fn open_with(data_path: impl AsRef<Path>, config: ReaderConfig, decoder: D) -> Result<Self> {
        let data_path = data_path.as_ref().to_path_buf();
        if !data_path.exists() {
            return Err(IndexError::missing(&data_path));
        }
        let index_path = index_path_for(&data_path);

        let loaded = if config.ignore_index {
            None
        } else {
            Self::try_load(&index_path, &data_path, &config)
        };

        let (index, rebuilt) = match loaded {
            Some(index) => (index, false),
            None => (
                Self::rebuild(&index_path, &data_path, &config, &decoder)?,
                true,
            ),
        };

        let file = BufReader::new(File::open(&data_path)?);
        Ok(Self {
            data_path,
            index_path,
            index,
            rebuilt,
            file,
            decoder,
            validate_crc: config.validate_crc,
        })
    }

    fn try_load(index_path: &Path, data_path: &Path, config: &ReaderConfig) -> Option<FileIndex> {
        if !index_path.exists() {
            debug!("No index file at {}", index_path.display());
            return None;
        }

        let options = LoadOptions::default()
            .with_data_path(data_path)
            .with_delete_on_error(config.delete_on_error);
        match FileIndex::load(index_path, &options) {
            Ok(index) => Some(index),
            Err(e) => {
                warn!(
                    "Unable to use index {}: {}. Regenerating.",
                    index_path.display(),
                    e
                );
                None
            }
        }
    }

    fn rebuild(
        index_path: &Path,
        data_path: &Path,
        config: &ReaderConfig,
        decoder: &D,
    ) -> Result<FileIndex> {
        let source = FramedLogSource::new(decoder.clone()).with_config(FramedLogConfig {
            validate_crc: config.validate_crc,
        });
        let index = FileIndexBuilder::from_source(&source, data_path)?;

        if config.save_index {
            if let Err(e) = index.save(index_path, Some(data_path)) {
                warn!("Failed to save index {}: {}", index_path.display(), e);
            }
        }
        Ok(index)
    }

    /// Returns the index of the data file.
    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    /// Returns the data file path.
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Returns the index file path.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Returns true if the index was regenerated rather than loaded.
    pub fn rebuilt(&self) -> bool {
        self.rebuilt
    }

    /// Reads the message referenced by `entry`.
    ///
    /// # Errors
    ///
    /// Returns an error if no valid message starts at the entry's offset.
    pub fn read_message(&mut self, entry: &IndexEntry) -> Result<LogMessage> {
        read_message_at(&mut self.file, entry.offset, &self.decoder, self.validate_crc)
    }

    /// Reads the messages referenced by every entry of `index`, in order.
    ///
    /// # Errors
    ///
    /// Returns the first read error.
    pub fn read_all(&mut self, index: &FileIndex) -> Result<Vec<LogMessage>> {
        index.iter().map(|entry| self.read_message(&entry)).collect()
    }
}
