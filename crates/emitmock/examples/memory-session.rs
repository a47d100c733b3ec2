//! In-process session against a fake ingestion service that echoes bodies.
//!
//! Run with:
//!   cargo run --example memory-session

use std::sync::Arc;
use std::time::Duration;

use emitmock::frame::Message;
use emitmock::session::{
    CancellationToken, Coordinator, LineProducer, LogSink, PayloadFormat, TickerProducer,
};
use emitmock::transport::{MemoryPeer, MemorySession};
use tracing::Span;

async fn echo(mut peer: MemoryPeer) {
    while let Some(message) = peer.recv().await {
        eprintln!("[{}] received {}", peer.name(), message.kind());
        if let Message::Body { payload } = message {
            if peer.send(Message::body(payload)).await.is_err() {
                break;
            }
        }
    }
    peer.close();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (session, mut acceptor) = MemorySession::new();
    tokio::spawn(async move {
        while let Some(peer) = acceptor.accept().await {
            tokio::spawn(echo(peer));
        }
    });

    let input: &'static [u8] = b"first line\nsecond line\n";
    let coordinator = Coordinator::new(Arc::new(session), Arc::new(LogSink), Span::none())
        .with_producer(LineProducer::new("lines", input, Span::none()))
        .with_producer(
            TickerProducer::new("ticker", Duration::from_millis(200), Span::none())
                .with_format(PayloadFormat::Raw),
        );

    let root = CancellationToken::new();
    tokio::spawn({
        let root = root.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            root.cancel();
        }
    });

    coordinator.run(&root).await?;
    eprintln!("session finished");
    Ok(())
}
