//! Session orchestration for emitmock.
//!
//! A [`Coordinator`] opens one channel per [`Producer`] and drives each with a
//! duplex [`pump`]: a reader draining inbound messages and a writer emitting
//! the producer's header, metadata and bodies. Every unit runs under a shared
//! cancellation scope; the first fault anywhere cancels the rest and becomes
//! the session's result.

pub mod coordinator;
pub mod error;
pub mod group;
pub mod lines;
pub mod producer;
pub mod pump;
pub mod sink;
pub mod span;
pub mod ticker;

pub use coordinator::Coordinator;
pub use error::{PumpError, PumpSide, Result, SessionError};
pub use group::TaskGroup;
pub use lines::{LineProducer, STDIN_PRODUCER};
pub use producer::Producer;
pub use sink::{DisplaySink, LogSink};
pub use span::{PayloadFormat, SpanRecord};
pub use ticker::{TickerProducer, MAX_PERIOD, PERIOD_METADATA_KEY, TICKER_PRODUCER};

pub use tokio_util::sync::CancellationToken;
