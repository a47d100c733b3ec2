mod exit;
mod logging;
mod output;
mod run;

use clap::Parser;
use emitmock_frame::DEFAULT_MAX_PAYLOAD;

use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;
use crate::run::{PayloadArg, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "emitmock",
    version,
    about = "Stream stdin lines and timer ticks to a telemetry-ingestion service"
)]
struct Cli {
    /// Ingestion service address: host:port or unix:/path/to/socket.
    #[arg(long, env = "EMITMOCK_TARGET", default_value = "127.0.0.1:3648")]
    target: String,

    /// Ticker period (e.g. 1s, 500ms, 2m).
    #[arg(long, default_value = "1s")]
    period: String,

    /// Body payload encoding.
    #[arg(long, value_enum, default_value = "span")]
    payload: PayloadArg,

    /// Largest payload accepted or sent, in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_PAYLOAD)]
    max_payload: usize,

    /// Output format for messages received from the service.
    #[arg(long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,
}

impl Cli {
    fn settings(self) -> Settings {
        Settings {
            target: self.target,
            period: self.period,
            payload: self.payload,
            max_payload: self.max_payload,
            format: self.format.unwrap_or_else(OutputFormat::default_for_stdout),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    match run::run(cli.settings()) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
