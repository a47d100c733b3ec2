//! Producer fed by a line-oriented input.

use std::borrow::Cow;

use async_trait::async_trait;
use bytes::Bytes;
use emitmock_frame::Metadata;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Split, Stdin};
use tracing::{debug, info, warn, Span};

use crate::producer::Producer;
use crate::span::{PayloadFormat, SpanRecord};

/// Default producer name for standard input.
pub const STDIN_PRODUCER: &str = "stdin";

/// Emits one payload per input line until the input ends or fails.
///
/// Lines are split on `\n` with a trailing `\r` removed; their bytes need not
/// be UTF-8. A read error ends the sequence the same way end-of-input does;
/// it is logged, not reported as a fault.
pub struct LineProducer<R> {
    name: String,
    metadata: Metadata,
    lines: Split<R>,
    format: PayloadFormat,
    received: u64,
    exhausted: bool,
    span: Span,
}

impl LineProducer<BufReader<Stdin>> {
    /// Line producer over the process's standard input.
    pub fn stdin(span: Span) -> Self {
        Self::new(STDIN_PRODUCER, BufReader::new(tokio::io::stdin()), span)
    }
}

impl<R> LineProducer<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(name: impl Into<String>, input: R, span: Span) -> Self {
        Self {
            name: name.into(),
            metadata: Metadata::new(),
            lines: input.split(b'\n'),
            format: PayloadFormat::default(),
            received: 0,
            exhausted: false,
            span,
        }
    }

    pub fn with_format(mut self, format: PayloadFormat) -> Self {
        self.format = format;
        self
    }

    /// Number of lines read so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    fn payload(&self, mut line: Vec<u8>) -> serde_json::Result<Bytes> {
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        match self.format {
            PayloadFormat::Raw => Ok(Bytes::from(line)),
            PayloadFormat::Span => {
                let text: Cow<'_, str> = String::from_utf8_lossy(&line);
                SpanRecord::line(self.received, &text).encode()
            }
        }
    }
}

#[async_trait]
impl<R> Producer for LineProducer<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    async fn next_payload(&mut self) -> Option<Bytes> {
        while !self.exhausted {
            match self.lines.next_segment().await {
                Ok(Some(line)) => {
                    self.received += 1;
                    debug!(parent: &self.span, id = self.received, len = line.len(), "line received");
                    match self.payload(line) {
                        Ok(payload) => return Some(payload),
                        Err(err) => {
                            warn!(parent: &self.span, id = self.received, error = %err, "failed to encode line span; skipping line")
                        }
                    }
                }
                Ok(None) => {
                    info!(parent: &self.span, lines = self.received, "input exhausted");
                    self.exhausted = true;
                }
                Err(err) => {
                    warn!(parent: &self.span, error = %err, "input failed; ending line producer");
                    self.exhausted = true;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn yields_each_line_then_ends() {
        let input: &[u8] = b"one\ntwo\r\nthree";
        let mut producer =
            LineProducer::new("stdin", input, Span::none()).with_format(PayloadFormat::Raw);

        assert_eq!(producer.name(), "stdin");
        assert!(producer.metadata().is_empty());
        assert_eq!(producer.next_payload().await, Some(Bytes::from_static(b"one")));
        assert_eq!(producer.next_payload().await, Some(Bytes::from_static(b"two")));
        assert_eq!(producer.next_payload().await, Some(Bytes::from_static(b"three")));
        assert_eq!(producer.next_payload().await, None);
        assert_eq!(producer.next_payload().await, None);
        assert_eq!(producer.received(), 3);
    }

    #[tokio::test]
    async fn span_payloads_number_lines() {
        let input: &[u8] = b"a\nbb\n";
        let mut producer = LineProducer::new("stdin", input, Span::none());

        for (expected_id, expected_line) in [(1u64, "a"), (2, "bb")] {
            let payload = producer.next_payload().await.unwrap();
            let record: SpanRecord = serde_json::from_slice(&payload).unwrap();
            assert_eq!(record.unstructured.as_deref(), Some(expected_line));
            assert!(matches!(
                record.time_events[1],
                crate::span::TimeEvent::MessageEvent { id, .. } if id == expected_id
            ));
        }
        assert_eq!(producer.next_payload().await, None);
    }

    #[tokio::test]
    async fn non_utf8_lines_pass_through_unchanged() {
        let input: &[u8] = b"first\ncaf\xe9\nthird\r\nfourth\n";
        let mut producer =
            LineProducer::new("stdin", input, Span::none()).with_format(PayloadFormat::Raw);

        let mut payloads = Vec::new();
        while let Some(payload) = producer.next_payload().await {
            payloads.push(payload);
        }
        assert_eq!(
            payloads,
            vec![
                Bytes::from_static(b"first"),
                Bytes::from_static(b"caf\xe9"),
                Bytes::from_static(b"third"),
                Bytes::from_static(b"fourth"),
            ]
        );
        assert_eq!(producer.received(), 4);
    }

    #[tokio::test]
    async fn non_utf8_line_span_is_lossy() {
        let input: &[u8] = b"caf\xe9\nnext\n";
        let mut producer = LineProducer::new("stdin", input, Span::none());

        let payload = producer.next_payload().await.unwrap();
        let record: SpanRecord = serde_json::from_slice(&payload).unwrap();
        assert_eq!(record.unstructured.as_deref(), Some("caf\u{fffd}"));

        let payload = producer.next_payload().await.unwrap();
        let record: SpanRecord = serde_json::from_slice(&payload).unwrap();
        assert_eq!(record.unstructured.as_deref(), Some("next"));
        assert_eq!(producer.next_payload().await, None);
    }
}
