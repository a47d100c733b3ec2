//! Producer fed by a fixed-period timer.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use emitmock_frame::Metadata;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn, Span};

use crate::producer::Producer;
use crate::span::{PayloadFormat, SpanRecord};

/// Default producer name for the timer.
pub const TICKER_PRODUCER: &str = "ticker";

/// Metadata key carrying the tick period in milliseconds.
pub const PERIOD_METADATA_KEY: &str = "period_ms";

/// Longest accepted tick period.
pub const MAX_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Emits one payload per period, forever.
///
/// The first payload is due one full period after the first call to
/// [`Producer::next_payload`], so time spent opening the channel does not
/// count. Ticks missed while the channel was blocked are delayed, not burst.
pub struct TickerProducer {
    name: String,
    metadata: Metadata,
    period: Duration,
    interval: Option<Interval>,
    format: PayloadFormat,
    ticks: u64,
    span: Span,
}

impl TickerProducer {
    /// # Panics
    ///
    /// Panics if `period` is zero or longer than [`MAX_PERIOD`].
    pub fn new(name: impl Into<String>, period: Duration, span: Span) -> Self {
        assert!(!period.is_zero(), "ticker period must be non-zero");
        assert!(
            period <= MAX_PERIOD,
            "ticker period must not exceed {MAX_PERIOD:?}"
        );

        let mut metadata = Metadata::new();
        metadata.insert(
            PERIOD_METADATA_KEY.to_string(),
            period.as_millis().to_string(),
        );

        Self {
            name: name.into(),
            metadata,
            period,
            interval: None,
            format: PayloadFormat::default(),
            ticks: 0,
            span,
        }
    }

    pub fn with_format(mut self, format: PayloadFormat) -> Self {
        self.format = format;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of ticks turned into payloads so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[async_trait]
impl Producer for TickerProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    async fn next_payload(&mut self) -> Option<Bytes> {
        let period = self.period;
        let span = &self.span;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        loop {
            interval.tick().await;
            self.ticks += 1;
            debug!(parent: span, tick = self.ticks, "tick");

            match self.format {
                PayloadFormat::Raw => return Some(Bytes::from(self.ticks.to_string())),
                PayloadFormat::Span => match SpanRecord::tick(self.ticks).encode() {
                    Ok(payload) => return Some(payload),
                    Err(err) => {
                        warn!(parent: span, error = %err, "failed to encode tick span; skipping tick")
                    }
                },
            }
        }
    }
}
