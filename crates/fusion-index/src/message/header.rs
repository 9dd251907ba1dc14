//! FusionEngine message header (24 bytes).
//!
//! ```text
//! ┌────────┬────────┬──────────┬──────────┬──────────┬─────────┬──────────┬──────────┬──────────┬──────────┐
//! │ sync0  │ sync1  │ reserved │   crc    │ protocol │ msg ver │   type   │ sequence │ payload  │  source  │
//! │ u8 '.' │ u8 '1' │  2 bytes │   u32    │    u8    │   u8    │   u16    │   u32    │   u32    │   u32    │
//! └────────┴────────┴──────────┴──────────┴──────────┴─────────┴──────────┴──────────┴──────────┴──────────┘
//! ```
//!
//! All fields are little-endian. The CRC-32 covers the header from the
//! protocol version byte onward, followed by the payload.

use crate::error::{IndexError, Result};
use crate::message::MessageType;
use std::io::Write;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 24;

/// Largest payload accepted before the header is considered corrupt (16 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 1 << 24;

/// First sync byte: `.`
pub const SYNC0: u8 = 0x2E;

/// Second sync byte: `1`
pub const SYNC1: u8 = 0x31;

/// Source identifier used when none is set.
pub const INVALID_SOURCE_ID: u32 = 0xFFFF_FFFF;

/// Offset of the first byte covered by the CRC.
const CRC_START: usize = 8;

/// Decoded FusionEngine message header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// CRC-32 of the header (from the protocol version on) and payload.
    pub crc: u32,
    /// Protocol version.
    pub protocol_version: u8,
    /// Payload format version.
    pub message_version: u8,
    /// Message type code.
    pub message_type: MessageType,
    /// Sequence number assigned by the sender.
    pub sequence_number: u32,
    /// Size of the payload following the header.
    pub payload_size_bytes: u32,
    /// Identifier of the message source.
    pub source_identifier: u32,
}

impl Default for MessageHeader {
    fn default() -> Self {
        Self {
            crc: 0,
            protocol_version: 2,
            message_version: 0,
            message_type: MessageType::INVALID,
            sequence_number: 0,
            payload_size_bytes: 0,
            source_identifier: INVALID_SOURCE_ID,
        }
    }
}

fn le_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

impl MessageHeader {
    /// Creates a header for the given message type with default fields.
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            ..Self::default()
        }
    }

    /// Total message size (header + payload) in bytes.
    pub fn message_size(&self) -> u64 {
        HEADER_SIZE as u64 + self.payload_size_bytes as u64
    }

    /// Decodes a header from the first [`HEADER_SIZE`] bytes of `buf`.
    ///
    /// Unknown type codes are accepted. The CRC is not checked here; see
    /// [`MessageHeader::validate_crc`].
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Format` if the buffer is too short or the sync
    /// bytes do not match.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(IndexError::Format(format!(
                "Header buffer too short: {} B < {} B",
                buf.len(),
                HEADER_SIZE
            )));
        }

        if buf[0] != SYNC0 || buf[1] != SYNC1 {
            return Err(IndexError::Format(format!(
                "Invalid sync bytes: sync0=0x{:02x}, sync1=0x{:02x}",
                buf[0], buf[1]
            )));
        }

        Ok(Self {
            crc: le_u32(buf, 4),
            protocol_version: buf[8],
            message_version: buf[9],
            message_type: MessageType::new(le_u16(buf, 10)),
            sequence_number: le_u32(buf, 12),
            payload_size_bytes: le_u32(buf, 16),
            source_identifier: le_u32(buf, 20),
        })
    }

    /// Encodes the header into a fixed-size buffer.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = SYNC0;
        buf[1] = SYNC1;
        // Reserved (2 bytes)
        buf[4..8].copy_from_slice(&self.crc.to_le_bytes());
        buf[8] = self.protocol_version;
        buf[9] = self.message_version;
        buf[10..12].copy_from_slice(&self.message_type.code().to_le_bytes());
        buf[12..16].copy_from_slice(&self.sequence_number.to_le_bytes());
        buf[16..20].copy_from_slice(&self.payload_size_bytes.to_le_bytes());
        buf[20..24].copy_from_slice(&self.source_identifier.to_le_bytes());
        buf
    }

    /// Sets the payload size and CRC for `payload`, returning the CRC.
    pub fn calculate_crc(&mut self, payload: &[u8]) -> u32 {
        self.payload_size_bytes = payload.len() as u32;
        let header = self.encode();
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header[CRC_START..]);
        hasher.update(payload);
        self.crc = hasher.finalize();
        self.crc
    }

    /// Checks the payload size limit and the CRC against `payload`.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Format` if the payload size fails the sanity check
    /// or the computed CRC differs from the stored one.
    pub fn validate_crc(&self, payload: &[u8]) -> Result<()> {
        if self.payload_size_bytes > MAX_PAYLOAD_SIZE {
            return Err(IndexError::Format(format!(
                "Payload length failed sanity check: {} B > {} B",
                self.payload_size_bytes, MAX_PAYLOAD_SIZE
            )));
        }

        let header = self.encode();
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header[CRC_START..]);
        hasher.update(payload);
        let computed = hasher.finalize();
        if computed != self.crc {
            return Err(IndexError::Format(format!(
                "CRC mismatch: type={}, payload_size={} B, expected=0x{:08x}, computed=0x{:08x}",
                self.message_type, self.payload_size_bytes, self.crc, computed
            )));
        }
        Ok(())
    }

    /// Writes a complete message (header with fresh CRC, then payload).
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_message<W: Write>(&mut self, writer: &mut W, payload: &[u8]) -> Result<u64> {
        self.calculate_crc(payload);
        writer.write_all(&self.encode())?;
        writer.write_all(payload)?;
        Ok(self.message_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let mut header = MessageHeader::new(MessageType::POSE);
        header.sequence_number = 7;
        header.source_identifier = 3;
        header.calculate_crc(&[1, 2, 3, 4]);

        let buf = header.encode();
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(&buf[0..2], b".1");

        let decoded = MessageHeader::decode(&buf).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.payload_size_bytes, 4);
        assert_eq!(decoded.message_size(), 28);
        decoded.validate_crc(&[1, 2, 3, 4]).unwrap();
    }

    #[test]
    fn test_header_invalid_sync() {
        let mut buf = MessageHeader::default().encode();
        buf[1] = b'2';
        assert!(matches!(
            MessageHeader::decode(&buf),
            Err(IndexError::Format(_))
        ));
    }

    #[test]
    fn test_header_short_buffer() {
        let buf = MessageHeader::default().encode();
        assert!(MessageHeader::decode(&buf[..10]).is_err());
    }

    #[test]
    fn test_crc_mismatch_detected() {
        let mut header = MessageHeader::new(MessageType::GNSS_INFO);
        header.calculate_crc(b"payload");
        assert!(header.validate_crc(b"pAyload").is_err());
    }

    #[test]
    fn test_unknown_type_accepted() {
        let header = MessageHeader::new(MessageType::new(4321));
        let decoded = MessageHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded.message_type.code(), 4321);
    }
}
