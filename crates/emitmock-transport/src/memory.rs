//! In-process channels backed by tokio mpsc queues.
//!
//! [`MemorySession`] hands the far end of every channel it opens to a
//! [`MemoryAcceptor`], which plays the role of the ingestion service.

use async_trait::async_trait;
use emitmock_frame::Message;
use tokio::sync::mpsc;
use tracing::debug;

use crate::channel::{Channel, ChannelReceiver, ChannelSender, Session};
use crate::error::{Result, TransportError};

/// Default queue depth for each direction of a memory channel.
pub const DEFAULT_CAPACITY: usize = 64;

/// Local sending half of a memory channel.
#[derive(Debug)]
pub struct MemorySender {
    tx: Option<mpsc::Sender<Message>>,
}

#[async_trait]
impl ChannelSender for MemorySender {
    async fn send(&mut self, message: Message) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(message).await.map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<()> {
        self.tx.take();
        Ok(())
    }
}

/// Local receiving half of a memory channel.
#[derive(Debug)]
pub struct MemoryReceiver {
    rx: mpsc::Receiver<Result<Message>>,
}

#[async_trait]
impl ChannelReceiver for MemoryReceiver {
    async fn receive(&mut self) -> Result<Message> {
        match self.rx.recv().await {
            Some(result) => result,
            None => Err(TransportError::Closed),
        }
    }
}

/// The far end of a memory channel.
#[derive(Debug)]
pub struct MemoryPeer {
    name: String,
    inbound: mpsc::Receiver<Message>,
    outbound: Option<mpsc::Sender<Result<Message>>>,
}

impl MemoryPeer {
    /// The name the channel was opened under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next message sent by the local side, or `None` once it closed.
    pub async fn recv(&mut self) -> Option<Message> {
        self.inbound.recv().await
    }

    /// Deliver a message to the local receiver.
    pub async fn send(&mut self, message: Message) -> Result<()> {
        self.deliver(Ok(message)).await
    }

    /// Make the local receiver fail with `err`.
    pub async fn fail(&mut self, err: TransportError) -> Result<()> {
        self.deliver(Err(err)).await
    }

    /// Finish the stream towards the local side. Its receiver then reports
    /// [`TransportError::Closed`].
    pub fn close(&mut self) {
        self.outbound.take();
    }

    /// Stop accepting messages from the local side. Further local sends fail.
    pub fn hang_up(&mut self) {
        self.inbound.close();
    }

    async fn deliver(&mut self, item: Result<Message>) -> Result<()> {
        let tx = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        tx.send(item).await.map_err(|_| TransportError::Closed)
    }
}

/// Create a connected memory channel and its far end.
pub fn memory_pair(name: impl Into<String>, capacity: usize) -> (Channel, MemoryPeer) {
    let name = name.into();
    let (local_tx, peer_rx) = mpsc::channel(capacity);
    let (peer_tx, local_rx) = mpsc::channel(capacity);

    let channel = Channel::new(
        name.clone(),
        MemorySender { tx: Some(local_tx) },
        MemoryReceiver { rx: local_rx },
    );
    let peer = MemoryPeer {
        name,
        inbound: peer_rx,
        outbound: Some(peer_tx),
    };
    (channel, peer)
}

/// A session whose channels stay inside the process.
#[derive(Debug, Clone)]
pub struct MemorySession {
    capacity: usize,
    accepted: mpsc::UnboundedSender<MemoryPeer>,
}

impl MemorySession {
    /// Create a session and the acceptor receiving its channels.
    pub fn new() -> (Self, MemoryAcceptor) {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a session with an explicit per-direction queue depth.
    pub fn with_capacity(capacity: usize) -> (Self, MemoryAcceptor) {
        let (accepted, pending) = mpsc::unbounded_channel();
        (Self { capacity, accepted }, MemoryAcceptor { pending })
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn open_channel(&self, name: &str) -> Result<Channel> {
        let (channel, peer) = memory_pair(name, self.capacity);
        self.accepted
            .send(peer)
            .map_err(|_| TransportError::Connect {
                target: format!("memory:{name}"),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            })?;
        debug!(channel = name, "opened memory channel");
        Ok(channel)
    }
}

/// Receives the far ends of channels opened on a [`MemorySession`].
#[derive(Debug)]
pub struct MemoryAcceptor {
    pending: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryAcceptor {
    /// Wait for the next opened channel, or `None` once every session clone
    /// is gone.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.pending.recv().await
    }
}
