//! FusionEngine message framing.
//!
//! The index only needs a small part of the protocol: the fixed-size header
//! (type and payload length), and a sequential decoder that reports each
//! message's byte offset and optional P1 time.

pub mod header;
pub mod stream;
pub mod types;

pub use header::{MessageHeader, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use stream::{
    read_message_at, FramedLogConfig, FramedLogReader, FramedLogSource, LeadingP1Time, LogMessage,
    MessageSource, NoP1Time, P1TimeDecoder,
};
pub use types::MessageType;
