//! Fusion Index - random access into FusionEngine binary logs
//!
//! A FusionEngine `.p1log` file is an append-only sequence of variable-length
//! messages. This crate maintains a compact `.p1i` side file listing the P1
//! time, type and byte offset of every message, so that readers can slice a
//! log by time, message type or position without re-parsing it.
//!
//! # Components
//!
//! - [`FileIndex`]: immutable index with type, time-range and positional queries
//! - [`FileIndexBuilder`]: builds an index while a log is decoded
//! - [`IndexedLog`]: loads (or regenerates) the index for a log and reads
//!   messages through it
//! - [`message`]: the message header and framed reader the index relies on
//!
//! # Example
//!
//! ```rust,ignore
//! use fusion_index::{IndexedLog, NanHint};
//! use fusion_index::message::MessageType;
//!
//! let mut log = IndexedLog::open("drive.p1log")?;
//!
//! let poses = log
//!     .index()
//!     .by_type(MessageType::POSE)
//!     .by_time_range(Some(300.0), Some(360.0), NanHint::RemoveNans)?;
//!
//! for message in log.read_all(&poses)? {
//!     // ...
//! }
//! ```

#![deny(missing_docs)]

pub mod error;
pub mod index;
pub mod message;
pub mod reader;

pub use error::{ConsistencyError, IndexError, Result};
pub use index::{
    FileIndex, FileIndexBuilder, IndexEntry, IndexSummary, LoadOptions, NanHint, TimeRange,
};
pub use reader::{IndexedLog, ReaderConfig};
