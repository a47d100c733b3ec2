//! The three message kinds a channel carries.
//!
//! Every channel carries exactly one Header, then at most one Metadata,
//! then any number of Body messages.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

/// Static key/value diagnostics announced once per channel.
pub type Metadata = BTreeMap<String, String>;

/// Wire tag for a header message.
pub const KIND_HEADER: u16 = 1;

/// Wire tag for a metadata message.
pub const KIND_METADATA: u16 = 2;

/// Wire tag for a body message.
pub const KIND_BODY: u16 = 3;

/// A message exchanged on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Names the producer feeding the channel. Always first.
    Header { name: String },
    /// Producer diagnostics. Second if present, never empty.
    Metadata { entries: Metadata },
    /// One opaque payload.
    Body { payload: Bytes },
}

impl Message {
    /// Create a header message.
    pub fn header(name: impl Into<String>) -> Self {
        Self::Header { name: name.into() }
    }

    /// Create a metadata message.
    pub fn metadata(entries: Metadata) -> Self {
        Self::Metadata { entries }
    }

    /// Create a body message.
    pub fn body(payload: impl Into<Bytes>) -> Self {
        Self::Body {
            payload: payload.into(),
        }
    }

    /// The fieldless kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Header { .. } => MessageKind::Header,
            Self::Metadata { .. } => MessageKind::Metadata,
            Self::Body { .. } => MessageKind::Body,
        }
    }
}

/// The tag of a [`Message`], without its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Header,
    Metadata,
    Body,
}

impl MessageKind {
    /// Wire tag for this kind.
    pub fn tag(self) -> u16 {
        match self {
            Self::Header => KIND_HEADER,
            Self::Metadata => KIND_METADATA,
            Self::Body => KIND_BODY,
        }
    }

    /// Resolve a wire tag, if known.
    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            KIND_HEADER => Some(Self::Header),
            KIND_METADATA => Some(Self::Metadata),
            KIND_BODY => Some(Self::Body),
            _ => None,
        }
    }

    /// Human-readable name for the kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Header => "HEADER",
            Self::Metadata => "METADATA",
            Self::Body => "BODY",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
