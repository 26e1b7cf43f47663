use super::{Transport, TransportError};
use bytes::Bytes;
use std::time::Duration;
use tokio::{sync::mpsc, time};

/// One end of an in-memory datagram link.
///
/// Built in pairs with [`ChannelTransport::pair`]; whatever one end sends the
/// other receives. Dropping an end makes receives on the other fail with
/// [`TransportError::Closed`] once its queue is drained.
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Bytes>,
    rx: mpsc::UnboundedReceiver<Bytes>,
}

impl ChannelTransport {
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (Self { tx: a_tx, rx: a_rx }, Self { tx: b_tx, rx: b_rx })
    }

    /// Queues a datagram for the peer without going through the async API.
    pub fn push(&self, datagram: impl Into<Bytes>) -> Result<(), TransportError> {
        self.tx
            .send(datagram.into())
            .map_err(|_| TransportError::Closed)
    }

    /// Stops receiving; the peer's sends fail from now on.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Transport for ChannelTransport {
    async fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        self.push(Bytes::copy_from_slice(datagram))
    }

    async fn recv_with_deadline(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Bytes>, TransportError> {
        match time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(datagram)) => Ok(Some(datagram)),
            Ok(None) => Err(TransportError::Closed),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_deadline_with_empty_queue_times_out() {
        let (mut a, _b) = ChannelTransport::pair();
        let received = a.recv_with_deadline(Duration::ZERO).await.unwrap();
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn zero_deadline_still_returns_queued_datagram() {
        let (mut a, b) = ChannelTransport::pair();
        b.push(vec![1u8, 2, 3]).unwrap();
        let received = a.recv_with_deadline(Duration::ZERO).await.unwrap();
        assert_eq!(received.as_deref(), Some(&[1, 2, 3][..]));
    }

    #[tokio::test]
    async fn dropping_peer_unblocks_pending_receive() {
        let (mut a, b) = ChannelTransport::pair();
        let pending = tokio::spawn(async move { a.recv_with_deadline(Duration::from_secs(60)).await });
        drop(b);
        let result = pending.await.unwrap();
        assert!(matches!(result, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn send_to_closed_peer_fails() {
        let (mut a, mut b) = ChannelTransport::pair();
        b.close();
        assert!(matches!(a.send(b"x").await, Err(TransportError::Closed)));
    }
}
