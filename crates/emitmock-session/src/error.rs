use std::fmt;

use emitmock_transport::TransportError;

/// Which task of a pump reported a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpSide {
    Reader,
    Writer,
}

impl PumpSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reader => "reader",
            Self::Writer => "writer",
        }
    }
}

impl fmt::Display for PumpSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transport fault that terminated a pump.
#[derive(Debug, thiserror::Error)]
#[error("{side} fault: {source}")]
pub struct PumpError {
    pub side: PumpSide,
    #[source]
    pub source: TransportError,
}

impl PumpError {
    pub fn reader(source: TransportError) -> Self {
        Self {
            side: PumpSide::Reader,
            source,
        }
    }

    pub fn writer(source: TransportError) -> Self {
        Self {
            side: PumpSide::Writer,
            source,
        }
    }
}

/// The fault that ended a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A channel could not be opened for a producer.
    #[error("opening channel for {producer}: {source}")]
    Open {
        producer: String,
        #[source]
        source: TransportError,
    },

    /// A producer's pump faulted.
    #[error("producer {producer}: {source}")]
    Pump {
        producer: String,
        #[source]
        source: PumpError,
    },
}

impl SessionError {
    /// Name of the producer whose unit faulted.
    pub fn producer(&self) -> &str {
        match self {
            Self::Open { producer, .. } | Self::Pump { producer, .. } => producer,
        }
    }

    /// The transport fault underneath.
    pub fn transport(&self) -> &TransportError {
        match self {
            Self::Open { source, .. } => source,
            Self::Pump { source, .. } => &source.source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
