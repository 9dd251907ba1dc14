//! FusionEngine file index.
//!
//! - [`record`]: 14-byte on-disk record codec
//! - [`FileIndex`]: immutable, queryable index of a data file
//! - [`FileIndexBuilder`]: incremental construction while decoding a log
//! - [`TimeRange`] / [`NanHint`]: time-based query parameters
//!
//! Loading an index always validates it against its data file when one is
//! available; any mismatch fails the load.

pub mod builder;
pub mod file_index;
pub mod record;
pub mod summary;
pub mod time_range;
mod validate;

pub use builder::FileIndexBuilder;
pub use file_index::{
    data_path_for, index_path_for, FileIndex, IndexEntry, Iter, LoadOptions, DATA_EXTENSION,
    INDEX_EXTENSION,
};
pub use record::{RawRecord, INVALID_TIME, RECORD_SIZE};
pub use summary::IndexSummary;
pub use time_range::{NanHint, TimeRange};
