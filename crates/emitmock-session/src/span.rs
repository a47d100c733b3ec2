//! Sample telemetry spans used as body payloads.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// How a producer turns its data into body payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadFormat {
    /// A JSON span record.
    #[default]
    Span,
    /// The bare data: the input line, or the tick counter.
    Raw,
}

/// An attribute value attached to a span or annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    String(String),
}

/// Span severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Completion status. Code 0 is OK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: i32,
    pub message: String,
}

/// Direction of a message event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageEventKind {
    Sent,
    Received,
}

/// Something that happened during a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimeEvent {
    Annotation {
        time_unix_nanos: u64,
        description: String,
        attributes: BTreeMap<String, AttributeValue>,
    },
    MessageEvent {
        time_unix_nanos: u64,
        kind: MessageEventKind,
        id: u64,
        uncompressed_size: u64,
    },
}

/// One span record, serialized as the body payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRecord {
    /// 8 random bytes, hex encoded.
    pub span_id: String,
    pub name: String,
    pub end_time_unix_nanos: u64,
    pub duration_nanos: u64,
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_events: Vec<TimeEvent>,
    pub status: Status,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unstructured: Option<String>,
}

impl SpanRecord {
    /// Span describing the `id`-th input line.
    pub fn line(id: u64, line: &str) -> Self {
        let now = now_unix_nanos();
        let size = line.len() as u64;

        let mut annotation = BTreeMap::new();
        annotation.insert("stdin.line.length".to_string(), AttributeValue::Int(size as i64));

        Self {
            time_events: vec![
                TimeEvent::Annotation {
                    time_unix_nanos: now,
                    description: "stdin received".to_string(),
                    attributes: annotation,
                },
                TimeEvent::MessageEvent {
                    time_unix_nanos: now,
                    kind: MessageEventKind::Received,
                    id,
                    uncompressed_size: size,
                },
            ],
            unstructured: Some(line.to_string()),
            ..Self::base("stdin line received", "read line from stdin", now)
        }
    }

    /// Span describing the `id`-th timer tick.
    pub fn tick(id: u64) -> Self {
        let now = now_unix_nanos();
        let mut record = Self::base("ticker value produced", "ticker fired", now);
        record
            .attributes
            .insert("ticker.tick.id".to_string(), AttributeValue::Int(id as i64));
        record
    }

    fn base(name: &str, status: &str, now: u64) -> Self {
        Self {
            span_id: span_id(),
            name: name.to_string(),
            end_time_unix_nanos: now,
            duration_nanos: 0,
            attributes: sample_attributes(),
            time_events: Vec::new(),
            status: Status {
                code: 0,
                message: status.to_string(),
            },
            severity: Severity::Debug,
            unstructured: None,
        }
    }

    /// Serialize to the body payload.
    pub fn encode(&self) -> serde_json::Result<Bytes> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}

fn sample_attributes() -> BTreeMap<String, AttributeValue> {
    let mut attributes = BTreeMap::new();
    attributes.insert("sample.bool.value".to_string(), AttributeValue::Bool(true));
    attributes.insert(
        "sample.string.value".to_string(),
        AttributeValue::String("greetings".to_string()),
    );
    attributes.insert("sample.int.value".to_string(), AttributeValue::Int(-74));
    attributes
}

fn span_id() -> String {
    hex::encode(rand::random::<u64>().to_le_bytes())
}

fn now_unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
