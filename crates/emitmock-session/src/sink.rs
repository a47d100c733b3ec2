use std::io;

use emitmock_frame::Message;
use tracing::debug;

/// Receives every inbound message a pump's reader drains.
///
/// Display failures are logged by the pump and never end it.
pub trait DisplaySink: Send + Sync {
    fn display(&self, producer: &str, message: &Message) -> io::Result<()>;
}

/// Sink that only logs inbound traffic.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DisplaySink for LogSink {
    fn display(&self, producer: &str, message: &Message) -> io::Result<()> {
        match message {
            Message::Body { payload } => {
                debug!(producer, kind = %message.kind(), size = payload.len(), "received message")
            }
            _ => debug!(producer, kind = %message.kind(), "received message"),
        }
        Ok(())
    }
}
