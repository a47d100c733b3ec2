use emitmock_frame::FrameError;

/// Errors that can occur on a channel or while opening one.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open a channel to the target.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The other side finished the stream, or this side already closed it.
    #[error("channel closed")]
    Closed,

    /// The target string is neither `host:port` nor `unix:/path`.
    #[error("invalid target {0:?} (expected host:port or unix:/path)")]
    InvalidTarget(String),
}

impl TransportError {
    /// Whether this error only reports that the stream ended.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
