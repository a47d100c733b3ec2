//! Duplex pump: one reader and one writer task driving a single channel.

use std::sync::Arc;

use emitmock_frame::{opening_messages, FrameOrder, Message};
use emitmock_transport::{Channel, ChannelReceiver, ChannelSender, TransportError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use crate::error::PumpError;
use crate::group::TaskGroup;
use crate::producer::Producer;
use crate::sink::DisplaySink;

/// Drive `channel` with `producer` until both tasks end.
///
/// The reader drains inbound messages into `sink`; the writer emits the
/// header, the metadata (when non-empty) and one body per payload. The first
/// fault of either task cancels the other and is returned. Cancellation of
/// `ctx`, the peer closing its stream and the producer running dry are not
/// faults. Both tasks have finished when this returns.
pub async fn run(
    ctx: &CancellationToken,
    channel: Channel,
    producer: Box<dyn Producer>,
    sink: Arc<dyn DisplaySink>,
) -> Result<(), PumpError> {
    let name = producer.name().to_owned();
    let (sender, receiver) = channel.split();

    let mut group = TaskGroup::new(ctx);
    let token = group.token().clone();
    group.spawn(
        read_loop(token.clone(), receiver, sink, name.clone())
            .instrument(info_span!("reader", producer = %name)),
    );
    group.spawn(
        write_loop(token, sender, producer).instrument(info_span!("writer", producer = %name)),
    );
    group.wait().await
}

async fn read_loop(
    token: CancellationToken,
    mut receiver: Box<dyn ChannelReceiver>,
    sink: Arc<dyn DisplaySink>,
    producer: String,
) -> Result<(), PumpError> {
    loop {
        let received = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("reader cancelled");
                return Ok(());
            }
            received = receiver.receive() => received,
        };

        match received {
            Ok(message) => {
                if let Err(err) = sink.display(&producer, &message) {
                    warn!(error = %err, "display sink failed");
                }
            }
            Err(TransportError::Closed) => {
                debug!("peer closed channel");
                return Ok(());
            }
            Err(err) => return Err(PumpError::reader(err)),
        }
    }
}

async fn write_loop(
    token: CancellationToken,
    mut sender: Box<dyn ChannelSender>,
    mut producer: Box<dyn Producer>,
) -> Result<(), PumpError> {
    let mut order = FrameOrder::new();

    for message in opening_messages(producer.name(), producer.metadata()) {
        if !send(&token, &mut order, sender.as_mut(), message).await? {
            return Ok(());
        }
    }

    loop {
        let payload = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(bodies = order.bodies(), "writer cancelled");
                return Ok(());
            }
            payload = producer.next_payload() => payload,
        };

        let Some(payload) = payload else {
            debug!(bodies = order.bodies(), "producer exhausted; closing channel");
            return tokio::select! {
                biased;
                _ = token.cancelled() => Ok(()),
                closed = sender.close() => closed.map_err(PumpError::writer),
            };
        };

        if !send(&token, &mut order, sender.as_mut(), Message::body(payload)).await? {
            return Ok(());
        }
    }
}

/// Send one message unless the pump is cancelled first.
///
/// Returns `Ok(false)` if cancellation won.
async fn send(
    token: &CancellationToken,
    order: &mut FrameOrder,
    sender: &mut dyn ChannelSender,
    message: Message,
) -> Result<bool, PumpError> {
    order
        .observe_message(&message)
        .map_err(|err| PumpError::writer(err.into()))?;

    let kind = message.kind();
    tokio::select! {
        biased;
        _ = token.cancelled() => Ok(false),
        sent = sender.send(message) => {
            sent.map_err(PumpError::writer)?;
            debug!(%kind, "sent");
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use emitmock_frame::{MessageKind, Metadata};
    use emitmock_transport::{memory_pair, MemoryPeer};
    use tracing::Span;

    use super::*;
    use crate::error::PumpSide;
    use crate::lines::LineProducer;
    use crate::sink::LogSink;
    use crate::span::PayloadFormat;
    use crate::ticker::TickerProducer;

    /// Yields queued payloads, then blocks forever.
    struct Scripted {
        metadata: Metadata,
        queued: VecDeque<Bytes>,
    }

    impl Scripted {
        fn new(payloads: &[&str]) -> Self {
            Self {
                metadata: Metadata::new(),
                queued: payloads
                    .iter()
                    .map(|p| Bytes::copy_from_slice(p.as_bytes()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl Producer for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn metadata(&self) -> &Metadata {
            &self.metadata
        }

        async fn next_payload(&mut self) -> Option<Bytes> {
            match self.queued.pop_front() {
                Some(payload) => Some(payload),
                None => std::future::pending().await,
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<Message>>,
    }

    impl DisplaySink for RecordingSink {
        fn display(&self, _producer: &str, message: &Message) -> io::Result<()> {
            self.seen.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct BrokenSink;

    impl DisplaySink for BrokenSink {
        fn display(&self, _producer: &str, _message: &Message) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    /// Collect everything the pump sends, then finish the peer's stream.
    fn record(mut peer: MemoryPeer) -> tokio::task::JoinHandle<Vec<Message>> {
        tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(message) = peer.recv().await {
                seen.push(message);
            }
            peer.close();
            seen
        })
    }

    fn kinds(messages: &[Message]) -> Vec<MessageKind> {
        messages.iter().map(Message::kind).collect()
    }

    fn reset() -> TransportError {
        TransportError::Io(io::Error::from(io::ErrorKind::ConnectionReset))
    }

    #[tokio::test]
    async fn exhausted_input_sends_one_body_per_line() {
        let ctx = CancellationToken::new();
        let (channel, peer) = memory_pair("stdin", 8);
        let recorder = record(peer);

        let input: &'static [u8] = b"one\ntwo\nthree\n";
        let producer =
            LineProducer::new("stdin", input, Span::none()).with_format(PayloadFormat::Raw);

        run(&ctx, channel, Box::new(producer), Arc::new(LogSink))
            .await
            .expect("exhaustion is not a fault");

        let seen = recorder.await.unwrap();
        assert_eq!(
            seen,
            vec![
                Message::header("stdin"),
                Message::body(Bytes::from_static(b"one")),
                Message::body(Bytes::from_static(b"two")),
                Message::body(Bytes::from_static(b"three")),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_sends_header_metadata_then_ticks_until_cancelled() {
        let ctx = CancellationToken::new();
        let (channel, peer) = memory_pair("ticker", 8);
        let recorder = record(peer);

        let producer = TickerProducer::new("ticker", Duration::from_secs(1), Span::none());
        let pump = tokio::spawn({
            let ctx = ctx.clone();
            async move { run(&ctx, channel, Box::new(producer), Arc::new(LogSink)).await }
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        ctx.cancel();

        pump.await.unwrap().expect("cancellation is not a fault");
        let seen = recorder.await.unwrap();
        assert_eq!(
            kinds(&seen),
            vec![
                MessageKind::Header,
                MessageKind::Metadata,
                MessageKind::Body,
                MessageKind::Body,
                MessageKind::Body,
            ]
        );
        assert!(matches!(&seen[1], Message::Metadata { entries } if entries["period_ms"] == "1000"));
    }

    #[tokio::test]
    async fn cancel_while_waiting_for_payload_is_clean() {
        let ctx = CancellationToken::new();
        let (channel, peer) = memory_pair("scripted", 8);
        let recorder = record(peer);

        let pump = tokio::spawn({
            let ctx = ctx.clone();
            async move {
                run(&ctx, channel, Box::new(Scripted::new(&["a"])), Arc::new(LogSink)).await
            }
        });

        tokio::task::yield_now().await;
        ctx.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), pump)
            .await
            .expect("pump should unwind promptly")
            .unwrap();
        assert!(result.is_ok());
        assert!(recorder.await.unwrap().len() <= 2);
    }

    #[tokio::test]
    async fn reader_fault_stops_writer_and_is_returned() {
        let ctx = CancellationToken::new();
        let (channel, mut peer) = memory_pair("scripted", 8);

        let pump = tokio::spawn({
            let ctx = ctx.clone();
            async move {
                run(&ctx, channel, Box::new(Scripted::new(&["a"])), Arc::new(LogSink)).await
            }
        });

        assert_eq!(peer.recv().await, Some(Message::header("scripted")));
        peer.fail(reset()).await.unwrap();

        let err = pump.await.unwrap().unwrap_err();
        assert_eq!(err.side, PumpSide::Reader);
        assert!(matches!(err.source, TransportError::Io(ref e) if e.kind() == io::ErrorKind::ConnectionReset));

        let mut after = Vec::new();
        while let Some(message) = peer.recv().await {
            after.push(message);
        }
        assert!(after.len() <= 1, "at most the body already in flight: {after:?}");
        assert!(!ctx.is_cancelled(), "a pump never cancels its caller's scope");
    }

    #[tokio::test]
    async fn send_failure_is_a_writer_fault() {
        let ctx = CancellationToken::new();
        let (channel, mut peer) = memory_pair("stdin", 8);
        peer.hang_up();

        let input: &'static [u8] = b"one\n";
        let producer = LineProducer::new("stdin", input, Span::none());
        let err = run(&ctx, channel, Box::new(producer), Arc::new(LogSink))
            .await
            .unwrap_err();

        assert_eq!(err.side, PumpSide::Writer);
        assert!(err.source.is_closed());
    }

    #[tokio::test]
    async fn inbound_messages_reach_sink_and_sink_errors_are_tolerated() {
        let ctx = CancellationToken::new();
        let (channel, mut peer) = memory_pair("scripted", 8);
        let sink = Arc::new(RecordingSink::default());

        let pump = tokio::spawn({
            let ctx = ctx.clone();
            let sink = Arc::clone(&sink);
            async move { run(&ctx, channel, Box::new(Scripted::new(&[])), sink).await }
        });

        peer.send(Message::body(Bytes::from_static(b"ack"))).await.unwrap();
        peer.close();
        assert_eq!(peer.recv().await, Some(Message::header("scripted")));
        ctx.cancel();
        pump.await.unwrap().unwrap();
        assert_eq!(
            *sink.seen.lock().unwrap(),
            vec![Message::body(Bytes::from_static(b"ack"))]
        );

        let ctx = CancellationToken::new();
        let (channel, mut peer) = memory_pair("scripted", 8);
        peer.send(Message::body(Bytes::from_static(b"ack"))).await.unwrap();
        peer.close();
        let pump = tokio::spawn({
            let ctx = ctx.clone();
            async move {
                run(&ctx, channel, Box::new(Scripted::new(&[])), Arc::new(BrokenSink)).await
            }
        });
        assert_eq!(peer.recv().await, Some(Message::header("scripted")));
        ctx.cancel();
        assert!(pump.await.unwrap().is_ok());
    }
}
