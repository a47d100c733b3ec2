use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use emitmock_frame::{FrameOrder, Message, MessageKind};
use emitmock_session::{
    CancellationToken, Coordinator, LineProducer, LogSink, PayloadFormat, PumpSide, SessionError,
    TickerProducer,
};
use emitmock_transport::{MemoryAcceptor, MemoryPeer, MemorySession, TransportError};
use tokio::task::JoinHandle;
use tracing::Span;

/// How the fake ingestion service treats one channel.
#[derive(Clone, Copy)]
enum Behaviour {
    /// Record everything until the client closes, then close back.
    Record,
    /// Fail the client's reader after the given delay.
    FailAfter(Duration),
}

type Recorded = HashMap<String, Vec<Message>>;

/// Accept `expected` channels and serve each according to `behaviour`.
fn serve(
    mut acceptor: MemoryAcceptor,
    expected: usize,
    behaviour: impl Fn(&str) -> Behaviour + Send + 'static,
) -> JoinHandle<Recorded> {
    tokio::spawn(async move {
        let mut handlers = Vec::new();
        for _ in 0..expected {
            let Some(peer) = acceptor.accept().await else {
                break;
            };
            let mode = behaviour(peer.name());
            handlers.push(tokio::spawn(handle(peer, mode)));
        }

        let mut recorded = Recorded::new();
        for handler in handlers {
            let (name, messages) = handler.await.expect("handler should not panic");
            recorded.insert(name, messages);
        }
        recorded
    })
}

async fn handle(mut peer: MemoryPeer, behaviour: Behaviour) -> (String, Vec<Message>) {
    let mut seen = Vec::new();
    if let Behaviour::FailAfter(delay) = behaviour {
        let deadline = tokio::time::sleep(delay);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => {
                    let _ = peer
                        .fail(TransportError::Io(io::Error::from(io::ErrorKind::ConnectionReset)))
                        .await;
                    break;
                }
                message = peer.recv() => match message {
                    Some(message) => seen.push(message),
                    None => break,
                },
            }
        }
    }
    while let Some(message) = peer.recv().await {
        seen.push(message);
    }
    peer.close();
    (peer.name().to_string(), seen)
}

fn assert_ordered(messages: &[Message]) {
    let mut order = FrameOrder::new();
    for message in messages {
        order
            .observe_message(message)
            .expect("channel traffic must follow header/metadata/body order");
    }
}

fn kinds(messages: &[Message]) -> Vec<MessageKind> {
    messages.iter().map(Message::kind).collect()
}

#[tokio::test(start_paused = true)]
async fn both_producers_run_until_shutdown() {
    let (session, acceptor) = MemorySession::new();
    let server = serve(acceptor, 2, |_| Behaviour::Record);

    let input: &'static [u8] = b"alpha\nbeta\ngamma\n";
    let coordinator = Coordinator::new(Arc::new(session), Arc::new(LogSink), Span::none())
        .with_producer(LineProducer::new("stdin", input, Span::none()))
        .with_producer(TickerProducer::new(
            "ticker",
            Duration::from_secs(1),
            Span::none(),
        ));
    assert_eq!(coordinator.producer_names(), vec!["stdin", "ticker"]);

    let root = CancellationToken::new();
    let running = tokio::spawn({
        let root = root.clone();
        async move { coordinator.run(&root).await }
    });

    tokio::time::sleep(Duration::from_millis(3500)).await;
    root.cancel();
    running
        .await
        .unwrap()
        .expect("clean shutdown is not a fault");

    let recorded = server.await.unwrap();
    let stdin = &recorded["stdin"];
    let ticker = &recorded["ticker"];
    assert_ordered(stdin);
    assert_ordered(ticker);

    assert_eq!(
        kinds(stdin),
        vec![
            MessageKind::Header,
            MessageKind::Body,
            MessageKind::Body,
            MessageKind::Body
        ]
    );
    assert_eq!(
        kinds(ticker),
        vec![
            MessageKind::Header,
            MessageKind::Metadata,
            MessageKind::Body,
            MessageKind::Body,
            MessageKind::Body
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn first_fault_cancels_the_other_pump() {
    let (session, acceptor) = MemorySession::new();
    let server = serve(acceptor, 2, |name| match name {
        "early" => Behaviour::FailAfter(Duration::from_millis(1500)),
        _ => Behaviour::FailAfter(Duration::from_secs(60)),
    });

    let coordinator = Coordinator::new(Arc::new(session), Arc::new(LogSink), Span::none())
        .with_producer(
            TickerProducer::new("early", Duration::from_secs(1), Span::none())
                .with_format(PayloadFormat::Raw),
        )
        .with_producer(
            TickerProducer::new("late", Duration::from_secs(1), Span::none())
                .with_format(PayloadFormat::Raw),
        );

    let root = CancellationToken::new();
    let err = coordinator.run(&root).await.unwrap_err();

    assert_eq!(err.producer(), "early");
    assert!(matches!(
        &err,
        SessionError::Pump { source, .. } if source.side == PumpSide::Reader
    ));
    assert!(!root.is_cancelled(), "the caller's token is never cancelled");

    let recorded = server.await.unwrap();
    let late = &recorded["late"];
    assert_ordered(late);
    assert!(
        late.iter().filter(|m| m.kind() == MessageKind::Body).count() <= 2,
        "late pump must stop once the session is cancelled: {late:?}"
    );
}

#[tokio::test]
async fn open_failure_is_reported_with_producer_name() {
    let (session, acceptor) = MemorySession::new();
    drop(acceptor);

    let coordinator = Coordinator::new(Arc::new(session), Arc::new(LogSink), Span::none())
        .with_producer(LineProducer::new("stdin", &b"never sent\n"[..], Span::none()));

    let err = coordinator
        .run(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(&err, SessionError::Open { producer, .. } if producer == "stdin"));
    assert!(matches!(err.transport(), TransportError::Connect { .. }));
}

#[tokio::test]
async fn no_producers_is_a_clean_session() {
    let (session, _acceptor) = MemorySession::new();
    let coordinator = Coordinator::new(Arc::new(session), Arc::new(LogSink), Span::none());
    assert!(coordinator.run(&CancellationToken::new()).await.is_ok());
}

#[tokio::test]
async fn pre_cancelled_session_opens_nothing() {
    let (session, mut acceptor) = MemorySession::new();
    let root = CancellationToken::new();
    root.cancel();

    let coordinator = Coordinator::new(Arc::new(session), Arc::new(LogSink), Span::none())
        .with_producer(LineProducer::new("stdin", &b"x\n"[..], Span::none()));
    assert!(coordinator.run(&root).await.is_ok());

    // The coordinator held the only session handle; nothing was ever opened.
    assert!(acceptor.accept().await.is_none());
}
