use std::fmt;

use async_trait::async_trait;
use emitmock_frame::Message;

use crate::error::Result;

/// The sending half of a channel.
///
/// Only one task ever holds it, which is what keeps a channel's messages in
/// order.
#[async_trait]
pub trait ChannelSender: Send {
    /// Send one message, waiting until the transport has accepted it.
    async fn send(&mut self, message: Message) -> Result<()>;

    /// Finish the outbound stream. The peer observes end-of-stream.
    async fn close(&mut self) -> Result<()>;
}

/// The receiving half of a channel.
#[async_trait]
pub trait ChannelReceiver: Send {
    /// Wait for the next inbound message.
    ///
    /// Returns [`TransportError::Closed`](crate::TransportError::Closed) once
    /// the peer has finished its stream.
    async fn receive(&mut self) -> Result<Message>;
}

/// One duplex message stream of a session.
///
/// A channel is used by splitting it: the sender goes to exactly one writer
/// and the receiver to exactly one reader.
pub struct Channel {
    name: String,
    sender: Box<dyn ChannelSender>,
    receiver: Box<dyn ChannelReceiver>,
}

impl Channel {
    /// Assemble a channel from its halves.
    pub fn new(
        name: impl Into<String>,
        sender: impl ChannelSender + 'static,
        receiver: impl ChannelReceiver + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            sender: Box::new(sender),
            receiver: Box::new(receiver),
        }
    }

    /// The name the channel was opened under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Separate the channel into its sending and receiving halves.
    pub fn split(self) -> (Box<dyn ChannelSender>, Box<dyn ChannelReceiver>) {
        (self.sender, self.receiver)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel").field("name", &self.name).finish()
    }
}

/// Opens independent channels to the ingestion service.
#[async_trait]
pub trait Session: Send + Sync {
    /// Open a new channel on behalf of the named producer.
    async fn open_channel(&self, name: &str) -> Result<Channel>;
}
