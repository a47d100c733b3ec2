use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use emitmock_frame::Message;
use emitmock_session::DisplaySink;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    producer: &'a str,
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entries: Option<&'a BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
    timestamp: String,
}

/// Prints messages received from the ingestion service to stdout.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    format: OutputFormat,
}

impl ConsoleSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl DisplaySink for ConsoleSink {
    fn display(&self, producer: &str, message: &Message) -> io::Result<()> {
        let mut out = io::stdout().lock();
        write_message(&mut out, self.format, producer, message)?;
        out.flush()
    }
}

pub fn write_message(
    out: &mut impl Write,
    format: OutputFormat,
    producer: &str,
    message: &Message,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let record = output_record(producer, message);
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PRODUCER", "KIND", "SIZE", "CONTENT"])
                .add_row(vec![
                    producer.to_string(),
                    message.kind().to_string(),
                    content_size(message).to_string(),
                    content_preview(message),
                ]);
            writeln!(out, "{table}")
        }
        OutputFormat::Pretty => writeln!(
            out,
            "producer={} kind={} size={} content={}",
            producer,
            message.kind(),
            content_size(message),
            content_preview(message)
        ),
        OutputFormat::Raw => match message {
            Message::Body { payload } => out.write_all(payload),
            _ => Ok(()),
        },
    }
}

fn output_record<'a>(producer: &'a str, message: &'a Message) -> MessageOutput<'a> {
    let mut record = MessageOutput {
        producer,
        kind: message.kind().name(),
        name: None,
        entries: None,
        payload_size: None,
        payload: None,
        timestamp: now_unix_seconds(),
    };
    match message {
        Message::Header { name } => record.name = Some(name.as_str()),
        Message::Metadata { entries } => record.entries = Some(entries),
        Message::Body { payload } => {
            record.payload_size = Some(payload.len());
            record.payload = Some(payload_preview(payload));
        }
    }
    record
}

fn content_size(message: &Message) -> usize {
    match message {
        Message::Header { name } => name.len(),
        Message::Metadata { entries } => entries.len(),
        Message::Body { payload } => payload.len(),
    }
}

fn content_preview(message: &Message) -> String {
    match message {
        Message::Header { name } => name.clone(),
        Message::Metadata { entries } => entries
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(","),
        Message::Body { payload } => payload_preview(payload),
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
