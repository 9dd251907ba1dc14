//! Log statistics derived from an index alone.

use crate::index::FileIndex;
use crate::message::MessageType;
use std::collections::BTreeMap;

/// Summary of the messages listed in an index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSummary {
    /// Total number of entries.
    pub message_count: usize,
    /// Number of entries without a P1 time.
    pub untimed_count: usize,
    /// First valid P1 time.
    pub first_time: Option<f64>,
    /// Last valid P1 time.
    pub last_time: Option<f64>,
    /// Entry count per message type.
    pub type_counts: BTreeMap<MessageType, usize>,
}

impl IndexSummary {
    /// Seconds between the first and last valid P1 time.
    ///
    /// Returns `None` unless at least two entries have a valid time.
    pub fn duration_sec(&self) -> Option<f64> {
        if self.message_count - self.untimed_count < 2 {
            return None;
        }
        match (self.first_time, self.last_time) {
            (Some(first), Some(last)) => Some(last - first),
            _ => None,
        }
    }

    /// Number of entries of the given type.
    pub fn count(&self, message_type: MessageType) -> usize {
        self.type_counts.get(&message_type).copied().unwrap_or(0)
    }
}

impl FileIndex {
    /// Computes message counts and time coverage for this index.
    pub fn summary(&self) -> IndexSummary {
        let mut type_counts = BTreeMap::new();
        for ty in self.types() {
            *type_counts.entry(*ty).or_insert(0) += 1;
        }

        let mut valid = self.times().iter().copied().filter(|t| !t.is_nan());
        let first_time = valid.next();
        let mut untimed_count = self.len();
        let mut last_time = None;
        if first_time.is_some() {
            untimed_count -= 1;
            last_time = first_time;
        }
        for t in valid {
            untimed_count -= 1;
            last_time = Some(t);
        }

        IndexSummary {
            message_count: self.len(),
            untimed_count,
            first_time,
            last_time,
            type_counts,
        }
    }
}
