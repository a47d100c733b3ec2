//! Channel and session capabilities for emitmock.
//!
//! A [`Session`] opens independent [`Channel`]s. Each channel is a duplex
//! stream of [`Message`](emitmock_frame::Message)s that is used by splitting
//! it into one [`ChannelSender`] and one [`ChannelReceiver`].
//!
//! Provided sessions:
//! - [`MemorySession`] keeps channels inside the process
//! - [`TcpSession`] opens one TCP connection per channel
//! - [`UnixSession`] opens one Unix domain socket connection per channel (unix only)

pub mod channel;
pub mod error;
pub mod memory;
pub mod stream;
pub mod target;

pub use channel::{Channel, ChannelReceiver, ChannelSender, Session};
pub use error::{Result, TransportError};
pub use memory::{memory_pair, MemoryAcceptor, MemoryPeer, MemorySession};
pub use stream::{framed_channel, FramedReceiver, FramedSender, TcpSession};
pub use target::Target;

#[cfg(unix)]
pub use stream::UnixSession;
