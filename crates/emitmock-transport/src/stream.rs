//! Channels over byte streams, one connection per channel.

#[cfg(unix)]
use std::path::PathBuf;

use async_trait::async_trait;
use emitmock_frame::{FrameConfig, Message, MessageCodec};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::debug;

use crate::channel::{Channel, ChannelReceiver, ChannelSender, Session};
use crate::error::{Result, TransportError};

/// Sending half of a stream channel.
pub struct FramedSender<W> {
    inner: FramedWrite<W, MessageCodec>,
}

#[async_trait]
impl<W> ChannelSender for FramedSender<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, message: Message) -> Result<()> {
        self.inner.send(message).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        SinkExt::<Message>::close(&mut self.inner).await?;
        Ok(())
    }
}

/// Receiving half of a stream channel.
pub struct FramedReceiver<R> {
    inner: FramedRead<R, MessageCodec>,
}

#[async_trait]
impl<R> ChannelReceiver for FramedReceiver<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn receive(&mut self) -> Result<Message> {
        match self.inner.next().await {
            Some(Ok(message)) => Ok(message),
            Some(Err(err)) => Err(err.into()),
            None => Err(TransportError::Closed),
        }
    }
}

/// Frame both halves of a split stream into a [`Channel`].
pub fn framed_channel<R, W>(
    name: impl Into<String>,
    read: R,
    write: W,
    config: &FrameConfig,
) -> Channel
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let sender = FramedSender {
        inner: FramedWrite::new(write, MessageCodec::with_config(config.clone())),
    };
    let receiver = FramedReceiver {
        inner: FramedRead::new(read, MessageCodec::with_config(config.clone())),
    };
    Channel::new(name, sender, receiver)
}

/// A session that opens one TCP connection per channel.
#[derive(Debug, Clone)]
pub struct TcpSession {
    addr: String,
    config: FrameConfig,
}

impl TcpSession {
    pub fn new(addr: impl Into<String>, config: FrameConfig) -> Self {
        Self {
            addr: addr.into(),
            config,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Session for TcpSession {
    async fn open_channel(&self, name: &str) -> Result<Channel> {
        let stream =
            TcpStream::connect(&self.addr)
                .await
                .map_err(|source| TransportError::Connect {
                    target: self.addr.clone(),
                    source,
                })?;
        stream.set_nodelay(true)?;
        debug!(channel = name, addr = %self.addr, "opened tcp channel");

        let (read, write) = stream.into_split();
        Ok(framed_channel(name, read, write, &self.config))
    }
}

/// A session that opens one Unix domain socket connection per channel.
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct UnixSession {
    path: PathBuf,
    config: FrameConfig,
}

#[cfg(unix)]
impl UnixSession {
    pub fn new(path: impl Into<PathBuf>, config: FrameConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(unix)]
#[async_trait]
impl Session for UnixSession {
    async fn open_channel(&self, name: &str) -> Result<Channel> {
        let stream = tokio::net::UnixStream::connect(&self.path)
            .await
            .map_err(|source| TransportError::Connect {
                target: format!("unix:{}", self.path.display()),
                source,
            })?;
        debug!(channel = name, path = ?self.path, "opened unix channel");

        let (read, write) = stream.into_split();
        Ok(framed_channel(name, read, write, &self.config))
    }
}
