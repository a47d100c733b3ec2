use async_trait::async_trait;
use bytes::Bytes;
use emitmock_frame::Metadata;

/// A source of body payloads for one channel.
///
/// A producer knows nothing about channels, tasks or other producers. The
/// pump reads its name and metadata once, then pulls payloads until the
/// sequence ends or the session is cancelled.
#[async_trait]
pub trait Producer: Send {
    /// Stable name, sent as the channel header.
    fn name(&self) -> &str;

    /// Diagnostics sent once after the header. Empty means none are sent.
    fn metadata(&self) -> &Metadata;

    /// Wait for the next payload; `None` once the sequence is exhausted.
    ///
    /// The pump drops this future when the session is cancelled, so an
    /// implementation must not lose a payload it has not yet returned.
    async fn next_payload(&mut self) -> Option<Bytes>;
}

#[async_trait]
impl<P> Producer for Box<P>
where
    P: Producer + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn metadata(&self) -> &Metadata {
        (**self).metadata()
    }

    async fn next_payload(&mut self) -> Option<Bytes> {
        (**self).next_payload().await
    }
}
