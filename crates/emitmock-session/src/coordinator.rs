//! Session coordinator: one pump per producer, first fault wins.

use std::sync::Arc;

use emitmock_transport::Session;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument, Span};

use crate::error::{Result, SessionError};
use crate::group::TaskGroup;
use crate::producer::Producer;
use crate::pump;
use crate::sink::DisplaySink;

/// Runs every configured producer against its own channel of one session.
///
/// All pumps share a cancellation scope derived from the caller's token. The
/// first pump to fault cancels that scope, every other pump unwinds, and the
/// fault becomes the session's result.
pub struct Coordinator {
    session: Arc<dyn Session>,
    sink: Arc<dyn DisplaySink>,
    producers: Vec<Box<dyn Producer>>,
    span: Span,
}

impl Coordinator {
    /// Create a coordinator logging under `span`.
    pub fn new(session: Arc<dyn Session>, sink: Arc<dyn DisplaySink>, span: Span) -> Self {
        Self {
            session,
            sink,
            producers: Vec::new(),
            span,
        }
    }

    /// Add a producer. Each producer gets its own channel.
    pub fn with_producer(mut self, producer: impl Producer + 'static) -> Self {
        self.producers.push(Box::new(producer));
        self
    }

    /// Names of the configured producers, in start order.
    pub fn producer_names(&self) -> Vec<&str> {
        self.producers.iter().map(|p| p.name()).collect()
    }

    /// Run until every pump has finished.
    ///
    /// Returns the first fault reported by any pump, or `Ok(())` if all of
    /// them ended cleanly (input exhausted, peer closed, or `ctx` cancelled).
    pub async fn run(self, ctx: &CancellationToken) -> Result<()> {
        let Self {
            session,
            sink,
            producers,
            span,
        } = self;

        let mut group = TaskGroup::new(ctx);
        let token = group.token().clone();
        for producer in producers {
            let unit = info_span!(parent: &span, "producer", name = %producer.name());
            group.spawn(
                run_unit(
                    token.clone(),
                    Arc::clone(&session),
                    producer,
                    Arc::clone(&sink),
                )
                .instrument(unit),
            );
        }
        info!(parent: &span, producers = group.len(), "session started");

        let result = group.wait().await;
        match &result {
            Ok(()) => info!(parent: &span, "session finished"),
            Err(err) => {
                error!(parent: &span, producer = err.producer(), error = %err, "session faulted")
            }
        }
        result
    }
}

async fn run_unit(
    token: CancellationToken,
    session: Arc<dyn Session>,
    producer: Box<dyn Producer>,
    sink: Arc<dyn DisplaySink>,
) -> Result<()> {
    let name = producer.name().to_owned();

    let opened = tokio::select! {
        biased;
        _ = token.cancelled() => return Ok(()),
        opened = session.open_channel(&name) => opened,
    };
    let channel = opened.map_err(|source| SessionError::Open {
        producer: name.clone(),
        source,
    })?;
    info!("channel opened");

    pump::run(&token, channel, producer, sink)
        .await
        .map_err(|source| SessionError::Pump {
            producer: name,
            source,
        })?;
    info!("producer finished");
    Ok(())
}
