//! Sequential message decoding over a FusionEngine data file.
//!
//! [`FramedLogReader`] walks a `.p1log` file frame by frame and yields one
//! [`LogMessage`] per intact message together with its byte offset. Bytes
//! that do not form a valid frame (foreign data interleaved in a mixed log,
//! truncated or corrupt messages) are skipped by rescanning for the next
//! sync sequence.

use crate::error::{IndexError, Result};
use crate::message::header::{MessageHeader, HEADER_SIZE, MAX_PAYLOAD_SIZE, SYNC0, SYNC1};
use crate::message::MessageType;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Read chunk size for the framed reader.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Seconds value marking an invalid P1 timestamp in message payloads.
const INVALID_TIMESTAMP_SECONDS: u32 = u32::MAX;

/// One decoded message from a data file.
#[derive(Debug, Clone, PartialEq)]
pub struct LogMessage {
    /// The decoded header.
    pub header: MessageHeader,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Offset of the header within the data file.
    pub offset: u64,
    /// P1 time reported by the payload, if the message carries one.
    pub p1_time: Option<f64>,
}

impl LogMessage {
    /// Returns the message type.
    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    /// Returns the total size of the message in bytes.
    pub fn size(&self) -> u64 {
        self.header.message_size()
    }
}

/// Extracts the P1 reference time of a message from its payload.
pub trait P1TimeDecoder {
    /// Returns the P1 time in seconds, or `None` if the message has none.
    fn p1_time(&self, header: &MessageHeader, payload: &[u8]) -> Option<f64>;
}

impl<F> P1TimeDecoder for F
where
    F: Fn(&MessageHeader, &[u8]) -> Option<f64>,
{
    fn p1_time(&self, header: &MessageHeader, payload: &[u8]) -> Option<f64> {
        self(header, payload)
    }
}

/// Decoder that reports no P1 time for any message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoP1Time;

impl P1TimeDecoder for NoP1Time {
    fn p1_time(&self, _header: &MessageHeader, _payload: &[u8]) -> Option<f64> {
        None
    }
}

/// Decoder for message types whose payload starts with a P1 timestamp.
///
/// The timestamp is encoded as `u32` whole seconds followed by `u32`
/// nanoseconds; whole seconds equal to `u32::MAX` mean the time is invalid.
#[derive(Debug, Clone)]
pub struct LeadingP1Time {
    types: Vec<MessageType>,
}

impl Default for LeadingP1Time {
    fn default() -> Self {
        Self {
            types: vec![
                MessageType::POSE,
                MessageType::GNSS_INFO,
                MessageType::GNSS_SATELLITE,
                MessageType::POSE_AUX,
                MessageType::CALIBRATION_STATUS,
                MessageType::RELATIVE_ENU_POSITION,
            ],
        }
    }
}

impl LeadingP1Time {
    /// Creates a decoder for a custom set of message types.
    pub fn new(types: Vec<MessageType>) -> Self {
        Self { types }
    }
}

impl P1TimeDecoder for LeadingP1Time {
    fn p1_time(&self, header: &MessageHeader, payload: &[u8]) -> Option<f64> {
        if !self.types.contains(&header.message_type) || payload.len() < 8 {
            return None;
        }

        let seconds = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
        if seconds == INVALID_TIMESTAMP_SECONDS {
            return None;
        }
        let nanos = u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
        Some(seconds as f64 + nanos as f64 * 1e-9)
    }
}

/// Configuration for the framed reader.
#[derive(Debug, Clone)]
pub struct FramedLogConfig {
    /// Drop frames whose CRC does not match their contents.
    pub validate_crc: bool,
}

impl Default for FramedLogConfig {
    fn default() -> Self {
        Self { validate_crc: true }
    }
}

/// A producer of decoded message streams for data files.
pub trait MessageSource {
    /// Iterator over the decoded messages of one file.
    type Iter: Iterator<Item = Result<LogMessage>>;

    /// Opens `data_path` for sequential decoding.
    ///
    /// With `ignore_index` set, the source must scan the file itself rather
    /// than consult any index previously generated for it.
    fn open(&self, data_path: &Path, ignore_index: bool) -> Result<Self::Iter>;
}

/// [`MessageSource`] backed by [`FramedLogReader`].
#[derive(Debug, Clone, Default)]
pub struct FramedLogSource<D = LeadingP1Time> {
    decoder: D,
    config: FramedLogConfig,
}

impl<D> FramedLogSource<D> {
    /// Creates a source with the given P1 time decoder.
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            config: FramedLogConfig::default(),
        }
    }

    /// Sets the reader configuration.
    pub fn with_config(mut self, config: FramedLogConfig) -> Self {
        self.config = config;
        self
    }
}

impl<D: P1TimeDecoder + Clone> MessageSource for FramedLogSource<D> {
    type Iter = FramedLogReader<BufReader<File>, D>;

    fn open(&self, data_path: &Path, ignore_index: bool) -> Result<Self::Iter> {
        if !data_path.exists() {
            return Err(IndexError::missing(data_path));
        }
        // The framed reader always scans the file, so there is no index to ignore.
        debug!(
            "Scanning {} (ignore_index={})",
            data_path.display(),
            ignore_index
        );
        let file = File::open(data_path)?;
        Ok(FramedLogReader::new(
            BufReader::new(file),
            self.decoder.clone(),
            self.config.clone(),
        ))
    }
}

/// Iterator over the framed messages of a byte stream.
pub struct FramedLogReader<R, D> {
    reader: R,
    decoder: D,
    config: FramedLogConfig,
    /// Buffered bytes; `buf[pos..]` is unconsumed.
    buf: Vec<u8>,
    /// Read cursor within `buf`.
    pos: usize,
    /// Stream offset of `buf[pos]`.
    offset: u64,
    /// Set once the underlying reader reports end of stream.
    eof: bool,
    /// Set after an I/O error has been returned.
    failed: bool,
    /// Number of bytes skipped while searching for frames.
    skipped_bytes: u64,
}

impl<R: Read, D: P1TimeDecoder> FramedLogReader<R, D> {
    /// Creates a reader over `reader`, which must be positioned at offset 0.
    pub fn new(reader: R, decoder: D, config: FramedLogConfig) -> Self {
        Self {
            reader,
            decoder,
            config,
            buf: Vec::with_capacity(READ_CHUNK_SIZE),
            pos: 0,
            offset: 0,
            eof: false,
            failed: false,
            skipped_bytes: 0,
        }
    }

    /// Returns the number of bytes skipped because they did not form a valid frame.
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped_bytes
    }

    fn available(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Reads until at least `needed` unconsumed bytes are buffered or the stream ends.
    ///
    /// Returns true if `needed` bytes are available.
    fn fill(&mut self, needed: usize) -> io::Result<bool> {
        if self.available() >= needed {
            return Ok(true);
        }

        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        while !self.eof && self.buf.len() < needed {
            let n = self.reader.read(&mut chunk)?;
            if n == 0 {
                self.eof = true;
            } else {
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }
        Ok(self.buf.len() >= needed)
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
        self.offset += n as u64;
    }

    fn skip(&mut self, n: usize) {
        self.skipped_bytes += n as u64;
        self.advance(n);
    }

    /// Moves the cursor to the next sync sequence. Returns false at end of stream.
    fn seek_sync(&mut self) -> io::Result<bool> {
        loop {
            if !self.fill(2)? {
                let rest = self.available();
                self.skip(rest);
                return Ok(false);
            }

            let window = &self.buf[self.pos..];
            let found = window
                .windows(2)
                .position(|w| w[0] == SYNC0 && w[1] == SYNC1);
            let window_len = window.len();
            match found {
                Some(i) => {
                    self.skip(i);
                    return Ok(true);
                }
                None => {
                    // Keep the last byte: it may be the first half of a sync pair.
                    self.skip(window_len - 1);
                    if self.eof {
                        self.skip(1);
                        return Ok(false);
                    }
                    self.fill(self.available() + 1)?;
                }
            }
        }
    }

    fn next_message(&mut self) -> io::Result<Option<LogMessage>> {
        loop {
            if !self.seek_sync()? {
                return Ok(None);
            }

            if !self.fill(HEADER_SIZE)? {
                let rest = self.available();
                self.skip(rest);
                return Ok(None);
            }

            let header = match MessageHeader::decode(&self.buf[self.pos..self.pos + HEADER_SIZE]) {
                Ok(h) if h.payload_size_bytes <= MAX_PAYLOAD_SIZE => h,
                _ => {
                    self.skip(1);
                    continue;
                }
            };

            let size = header.message_size() as usize;
            if !self.fill(size)? {
                // Truncated frame or a false sync match near the end of the stream.
                self.skip(1);
                continue;
            }

            let payload = &self.buf[self.pos + HEADER_SIZE..self.pos + size];
            if self.config.validate_crc {
                if let Err(e) = header.validate_crc(payload) {
                    debug!("Skipping frame at offset {}: {}", self.offset, e);
                    self.skip(1);
                    continue;
                }
            }

            let p1_time = self.decoder.p1_time(&header, payload);
            let message = LogMessage {
                payload: payload.to_vec(),
                header,
                offset: self.offset,
                p1_time,
            };
            self.advance(size);
            return Ok(Some(message));
        }
    }
}

impl<R: Read, D: P1TimeDecoder> Iterator for FramedLogReader<R, D> {
    type Item = Result<LogMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_message() {
            Ok(message) => message.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e.into()))
            }
        }
    }
}

/// Reads the single message whose header starts at `offset`.
///
/// # Errors
///
/// Returns `IndexError::Format` if no valid header is found at `offset` or
/// (with `validate_crc`) the CRC does not match, and an I/O error if the
/// message extends past the end of the stream.
pub fn read_message_at<R, D>(
    reader: &mut R,
    offset: u64,
    decoder: &D,
    validate_crc: bool,
) -> Result<LogMessage>
where
    R: Read + Seek,
    D: P1TimeDecoder + ?Sized,
{
    reader.seek(SeekFrom::Start(offset))?;
    let mut header_buf = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_buf)?;
    let header = MessageHeader::decode(&header_buf)?;
    if header.payload_size_bytes > MAX_PAYLOAD_SIZE {
        return Err(IndexError::Format(format!(
            "Payload length failed sanity check at offset {}: {} B",
            offset, header.payload_size_bytes
        )));
    }

    let mut payload = vec![0u8; header.payload_size_bytes as usize];
    reader.read_exact(&mut payload)?;
    if validate_crc {
        header.validate_crc(&payload)?;
    }

    let p1_time = decoder.p1_time(&header, &payload);
    Ok(LogMessage {
        header,
        payload,
        offset,
        p1_time,
    })
}
