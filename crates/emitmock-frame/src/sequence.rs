//! Header → Metadata? → Body* ordering.
//!
//! [`opening_messages`] builds the prologue a producer emits before its first
//! body. [`FrameOrder`] tracks one channel's traffic and rejects anything that
//! breaks the ordering, whichever side of the channel is checking.

use tracing::trace;

use crate::error::{FrameError, Result};
use crate::message::{Message, MessageKind, Metadata};

/// The messages that open a channel, in send order.
///
/// An empty metadata map omits the Metadata message entirely rather than
/// sending one with no entries.
pub fn opening_messages(name: &str, metadata: &Metadata) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);
    messages.push(Message::header(name));
    if !metadata.is_empty() {
        messages.push(Message::metadata(metadata.clone()));
    }
    messages
}

/// Where a channel is within its message sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    /// Nothing has been observed yet.
    #[default]
    AwaitingHeader,
    /// The header has been observed; metadata or bodies may follow.
    AfterHeader,
    /// Metadata has been observed; only bodies may follow.
    AfterMetadata,
    /// At least one body has been observed.
    Streaming,
}

/// Ordering guard for a single channel.
#[derive(Debug, Clone, Default)]
pub struct FrameOrder {
    state: FrameState,
    bodies: u64,
}

impl FrameOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the next message kind, failing if it breaks the ordering.
    ///
    /// A rejected kind leaves the state untouched.
    pub fn observe(&mut self, kind: MessageKind) -> Result<()> {
        let next = match (self.state, kind) {
            (FrameState::AwaitingHeader, MessageKind::Header) => FrameState::AfterHeader,
            (FrameState::AwaitingHeader, found) => {
                return Err(FrameError::OutOfOrder {
                    expected: "HEADER",
                    found,
                })
            }
            (FrameState::AfterHeader, MessageKind::Metadata) => FrameState::AfterMetadata,
            (FrameState::AfterHeader | FrameState::AfterMetadata, MessageKind::Body)
            | (FrameState::Streaming, MessageKind::Body) => FrameState::Streaming,
            (FrameState::AfterHeader, found) => {
                return Err(FrameError::OutOfOrder {
                    expected: "METADATA or BODY",
                    found,
                })
            }
            (FrameState::AfterMetadata | FrameState::Streaming, found) => {
                return Err(FrameError::OutOfOrder {
                    expected: "BODY",
                    found,
                })
            }
        };
        if kind == MessageKind::Body {
            self.bodies += 1;
        }
        trace!(from = ?self.state, to = ?next, "frame order advanced");
        self.state = next;
        Ok(())
    }

    /// Shorthand for `observe(message.kind())`.
    pub fn observe_message(&mut self, message: &Message) -> Result<()> {
        self.observe(message.kind())
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Number of bodies observed so far.
    pub fn bodies(&self) -> u64 {
        self.bodies
    }
}
