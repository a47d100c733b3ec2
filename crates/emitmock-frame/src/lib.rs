//! Message framing for emitmock channels.
//!
//! Every channel carries one ordered sequence:
//! - exactly one Header naming the producer, first
//! - at most one Metadata map, second, and only when non-empty
//! - any number of Body payloads
//!
//! Stream transports carry each message in an 8-byte header frame
//! (magic "EM", 4-byte little-endian length, 2-byte little-endian kind).

pub mod codec;
pub mod error;
pub mod message;
pub mod sequence;

pub use codec::{
    decode_message, encode_message, FrameConfig, MessageCodec, DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use message::{Message, MessageKind, Metadata, KIND_BODY, KIND_HEADER, KIND_METADATA};
pub use sequence::{opening_messages, FrameOrder, FrameState};
