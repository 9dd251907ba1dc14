//! Fixed-width on-disk index record (14 bytes).
//!
//! ```text
//! ┌──────────────────┬──────────┬──────────────────┐
//! │ integer_time u32 │ type u16 │    offset u64    │
//! └──────────────────┴──────────┴──────────────────┘
//! ```
//!
//! All fields are little-endian with no padding. Records are concatenated
//! without framing; the record count is the file size divided by
//! [`RECORD_SIZE`].
//!
//! Only the whole-second part of a timestamp is stored: a time of 123.75 is
//! written as 123 and reads back as 123.0. Missing times are stored as
//! [`INVALID_TIME`] and read back as NaN.

use crate::error::{IndexError, Result};
use crate::index::IndexEntry;
use crate::message::MessageType;
use std::io::Write;

/// Size of one encoded record in bytes.
pub const RECORD_SIZE: usize = 14;

/// Integer time value marking an entry without a valid timestamp.
pub const INVALID_TIME: u32 = u32::MAX;

/// One index record as laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord {
    /// Floored P1 time in seconds, or [`INVALID_TIME`].
    pub integer_time: u32,
    /// Message type code.
    pub message_type: u16,
    /// Byte offset of the message header in the data file.
    pub offset: u64,
}

impl RawRecord {
    /// Converts an in-memory entry to its on-disk form.
    ///
    /// NaN times map to [`INVALID_TIME`]. Other times are floored; values
    /// below zero clamp to 0 and values too large for the field clamp to the
    /// largest valid (non-sentinel) value.
    pub fn from_entry(entry: &IndexEntry) -> Self {
        let integer_time = if entry.time.is_nan() {
            INVALID_TIME
        } else {
            let floored = entry.time.floor();
            if floored >= INVALID_TIME as f64 {
                INVALID_TIME - 1
            } else {
                // Saturating cast: negative values become 0.
                floored as u32
            }
        };

        Self {
            integer_time,
            message_type: entry.message_type.code(),
            offset: entry.offset,
        }
    }

    /// Converts this record to an in-memory entry.
    pub fn to_entry(self) -> IndexEntry {
        let time = if self.integer_time == INVALID_TIME {
            f64::NAN
        } else {
            self.integer_time as f64
        };

        IndexEntry {
            time,
            message_type: MessageType::new(self.message_type),
            offset: self.offset,
        }
    }

    /// Encodes the record using little-endian byte order.
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        // Integer time (4 bytes)
        buf[0..4].copy_from_slice(&self.integer_time.to_le_bytes());
        // Type (2 bytes)
        buf[4..6].copy_from_slice(&self.message_type.to_le_bytes());
        // Offset (8 bytes)
        buf[6..14].copy_from_slice(&self.offset.to_le_bytes());
        buf
    }

    /// Decodes a record from exactly [`RECORD_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Format` if `buf` has the wrong length.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != RECORD_SIZE {
            return Err(IndexError::Format(format!(
                "Index record size mismatch: {} B != {} B",
                buf.len(),
                RECORD_SIZE
            )));
        }

        let integer_time = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let message_type = u16::from_le_bytes([buf[4], buf[5]]);
        let mut offset_bytes = [0u8; 8];
        offset_bytes.copy_from_slice(&buf[6..14]);
        let offset = u64::from_le_bytes(offset_bytes);

        Ok(Self {
            integer_time,
            message_type,
            offset,
        })
    }

    /// Writes the encoded record to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }
}

/// Decodes a buffer of concatenated records.
///
/// # Errors
///
/// Returns `IndexError::Format` if the buffer length is not a multiple of
/// [`RECORD_SIZE`].
pub fn decode_records(buf: &[u8]) -> Result<Vec<IndexEntry>> {
    if buf.len() % RECORD_SIZE != 0 {
        return Err(IndexError::Format(format!(
            "Index buffer length {} B is not a multiple of the {} B record size",
            buf.len(),
            RECORD_SIZE
        )));
    }

    buf.chunks_exact(RECORD_SIZE)
        .map(|chunk| RawRecord::decode(chunk).map(RawRecord::to_entry))
        .collect()
}

/// Encodes entries as concatenated records.
pub fn encode_records<'a, I>(entries: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a IndexEntry>,
{
    let iter = entries.into_iter();
    let mut buf = Vec::with_capacity(iter.size_hint().0 * RECORD_SIZE);
    for entry in iter {
        buf.extend_from_slice(&RawRecord::from_entry(entry).encode());
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(time: f64, ty: u16, offset: u64) -> IndexEntry {
        IndexEntry::new(time, MessageType::new(ty), offset)
    }

    #[test]
    fn test_record_layout() {
        let record = RawRecord {
            integer_time: 0x0403_0201,
            message_type: 0x0605,
            offset: 0x0E0D_0C0B_0A09_0807,
        };
        let buf = record.encode();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14]);
        assert_eq!(RawRecord::decode(&buf).unwrap(), record);
    }

    #[test]
    fn test_integer_time_roundtrip() {
        let original = entry(1234.0, 10000, 987_654_321);
        let decoded = RawRecord::decode(&RawRecord::from_entry(&original).encode())
            .unwrap()
            .to_entry();
        assert_eq!(decoded.time, 1234.0);
        assert_eq!(decoded.message_type, MessageType::POSE);
        assert_eq!(decoded.offset, 987_654_321);
    }

    #[test]
    fn test_fractional_time_truncated() {
        let decoded = RawRecord::from_entry(&entry(123.75, 5, 40)).to_entry();
        assert_eq!(decoded.time, 123.0);
        assert_eq!(decoded.offset, 40);

        // Truncation, not rounding.
        let decoded = RawRecord::from_entry(&entry(9.999, 5, 0)).to_entry();
        assert_eq!(decoded.time, 9.0);
    }

    #[test]
    fn test_nan_sentinel() {
        let record = RawRecord::from_entry(&entry(f64::NAN, 13004, 12));
        assert_eq!(record.integer_time, INVALID_TIME);
        assert!(record.to_entry().time.is_nan());
    }

    #[test]
    fn test_out_of_range_times_clamped() {
        assert_eq!(RawRecord::from_entry(&entry(-3.5, 1, 0)).integer_time, 0);
        assert_eq!(
            RawRecord::from_entry(&entry(1e12, 1, 0)).integer_time,
            INVALID_TIME - 1
        );
    }

    #[test]
    fn test_decode_records_bad_length() {
        let mut buf = encode_records(&[entry(1.0, 1, 0), entry(2.0, 1, 30)]);
        assert_eq!(buf.len(), 2 * RECORD_SIZE);
        assert_eq!(decode_records(&buf).unwrap().len(), 2);

        buf.push(0);
        assert!(matches!(decode_records(&buf), Err(IndexError::Format(_))));
        assert!(RawRecord::decode(&buf[..5]).is_err());
    }
}
