use crate::message::MessageKind;

/// Errors that can occur while framing or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x454d \"EM\")")]
    InvalidMagic,

    /// The frame header names a message kind this codec does not know.
    #[error("unknown message kind {0}")]
    UnknownKind(u16),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A header frame carried a name that is not valid UTF-8.
    #[error("header name is not valid UTF-8: {0}")]
    InvalidHeader(#[from] std::str::Utf8Error),

    /// A metadata frame carried something other than a JSON string map.
    #[error("metadata is not a JSON string map: {0}")]
    InvalidMetadata(#[from] serde_json::Error),

    /// A message was emitted or received out of header/metadata/body order.
    #[error("{found} message out of order (expected {expected})")]
    OutOfOrder {
        expected: &'static str,
        found: MessageKind,
    },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
