use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{FrameError, Result};
use crate::message::{Message, MessageKind, Metadata};

/// Frame header: magic (2) + length (4) + kind (2) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Magic bytes: "EM" (0x45 0x4D).
pub const MAGIC: [u8; 2] = [0x45, 0x4D];

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────┬──────────┬─────────────────┐
/// │ Magic (2B)   │ Length    │ Kind     │ Payload          │
/// │ 0x45 0x4D    │ (4B LE)  │ (2B LE)  │ (Length bytes)   │
/// │ "EM"         │          │          │                  │
/// └──────────────┴───────────┴──────────┴─────────────────┘
/// ```
///
/// Header payloads are the UTF-8 producer name, metadata payloads a JSON
/// object of strings, body payloads are carried verbatim.
pub fn encode_message(message: &Message, max_payload: usize, dst: &mut BytesMut) -> Result<()> {
    let payload: Bytes = match message {
        Message::Header { name } => Bytes::copy_from_slice(name.as_bytes()),
        Message::Metadata { entries } => Bytes::from(serde_json::to_vec(entries)?),
        Message::Body { payload } => payload.clone(),
    };

    let limit = max_payload.min(u32::MAX as usize);
    if payload.len() > limit {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: limit,
        });
    }

    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(payload.len() as u32);
    dst.put_u16_le(message.kind().tag());
    dst.put_slice(&payload);
    Ok(())
}

/// Decode a message from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_message(src: &mut BytesMut, max_payload: usize) -> Result<Option<Message>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }

    let payload_len = u32::from_le_bytes([src[2], src[3], src[4], src[5]]) as usize;
    let tag = u16::from_le_bytes([src[6], src[7]]);

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }
    let kind = MessageKind::from_tag(tag).ok_or(FrameError::UnknownKind(tag))?;

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    let message = match kind {
        MessageKind::Header => Message::Header {
            name: std::str::from_utf8(&payload)?.to_owned(),
        },
        MessageKind::Metadata => Message::Metadata {
            entries: serde_json::from_slice::<Metadata>(&payload)?,
        },
        MessageKind::Body => Message::Body { payload },
    };
    Ok(Some(message))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// `tokio_util` codec for stream transports.
#[derive(Debug, Clone, Default)]
pub struct MessageCodec {
    config: FrameConfig,
}

impl MessageCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self { config }
    }

    /// Current codec configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        encode_message(&item, self.config.max_payload_size, dst)
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        decode_message(src, self.config.max_payload_size)
    }
}
