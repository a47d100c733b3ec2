use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use emitmock_frame::FrameConfig;
use emitmock_session::{
    CancellationToken, Coordinator, LineProducer, PayloadFormat, TickerProducer, MAX_PERIOD,
    TICKER_PRODUCER,
};
use emitmock_transport::Target;
use tracing::{info, warn};

use crate::exit::{io_error, session_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::logging::session_span;
use crate::output::{ConsoleSink, OutputFormat};

/// Body payload encoding selectable on the command line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PayloadArg {
    /// JSON span records.
    Span,
    /// The bare line or tick counter.
    Raw,
}

impl From<PayloadArg> for PayloadFormat {
    fn from(arg: PayloadArg) -> Self {
        match arg {
            PayloadArg::Span => PayloadFormat::Span,
            PayloadArg::Raw => PayloadFormat::Raw,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub target: String,
    pub period: String,
    pub payload: PayloadArg,
    pub max_payload: usize,
    pub format: OutputFormat,
}

/// Run one session against the configured target until it ends.
pub fn run(settings: Settings) -> CliResult<i32> {
    let period = parse_duration(&settings.period)?;
    if settings.max_payload == 0 {
        return Err(CliError::new(USAGE, "--max-payload must be greater than zero"));
    }
    let target: Target = settings
        .target
        .parse()
        .map_err(|err| transport_error("invalid --target", err))?;
    let session = target
        .session(FrameConfig {
            max_payload_size: settings.max_payload,
        })
        .map_err(|err| transport_error("unsupported --target", err))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;

    let span = session_span(&target.to_string());
    let format = PayloadFormat::from(settings.payload);
    let sink = Arc::new(ConsoleSink::new(settings.format));

    let result = runtime.block_on(async {
        let root = CancellationToken::new();
        tokio::spawn({
            let root = root.clone();
            let span = span.clone();
            async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!(parent: &span, "interrupted; shutting down"),
                    Err(err) => warn!(parent: &span, error = %err, "ctrl-c handler unavailable"),
                }
                root.cancel();
            }
        });

        let coordinator = Coordinator::new(session, sink, span.clone())
            .with_producer(LineProducer::stdin(span.clone()).with_format(format))
            .with_producer(
                TickerProducer::new(TICKER_PRODUCER, period, span.clone()).with_format(format),
            );
        coordinator.run(&root).await
    });

    // Stdin reads park a blocking thread that never returns on its own.
    runtime.shutdown_background();

    result.map_err(session_error)?;
    Ok(SUCCESS)
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else if let Some(num) = input.strip_suffix('m') {
        (num, "m")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    let duration = match unit {
        "ms" => Some(Duration::from_millis(value)),
        "s" => Some(Duration::from_secs(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs),
        _ => {
            return Err(CliError::new(
                USAGE,
                format!("unsupported duration unit: {unit}"),
            ))
        }
    };

    match duration {
        Some(duration) if duration <= MAX_PERIOD => Ok(duration),
        _ => Err(CliError::new(
            USAGE,
            format!("duration must not exceed {}s: {input}", MAX_PERIOD.as_secs()),
        )),
    }
}
