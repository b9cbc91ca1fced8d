//! Bounded outbound delivery queue for one connection.
//!
//! Each connection owns exactly one sink pair: the [`OutboundSink`]
//! handle lives in the registry for delivery, the [`SinkReceiver`] is
//! drained by that connection's write loop. Closing the sink (from
//! either side) is the designated "stop delivering" signal; it is
//! idempotent and also unblocks any sender waiting on a full queue.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::message::Message;

/// Default queue capacity per connection.
pub const DEFAULT_SINK_CAPACITY: usize = 16;

/// Outcome of a delivery attempt. Pushing to a closed sink is a no-op
/// for the caller to log, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Closed,
}

/// Sending half of a connection's outbound queue.
///
/// Cheap to clone; the registry holds one and fan-out snapshots clone
/// it. Cloning never extends the paired write loop's lifetime beyond
/// the close signal.
#[derive(Debug, Clone)]
pub struct OutboundSink {
    tx: mpsc::Sender<Message>,
    closed: CancellationToken,
}

/// Receiving half, owned exclusively by the connection's write loop.
#[derive(Debug)]
pub struct SinkReceiver {
    rx: mpsc::Receiver<Message>,
    closed: CancellationToken,
}

impl OutboundSink {
    /// Create a sink pair with the given queue capacity.
    pub fn channel(capacity: usize) -> (OutboundSink, SinkReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        let closed = CancellationToken::new();
        (
            OutboundSink {
                tx,
                closed: closed.clone(),
            },
            SinkReceiver { rx, closed },
        )
    }

    /// Push a message in FIFO order, waiting while the queue is full.
    ///
    /// Returns [`Delivery::Closed`] without queueing once the sink has
    /// been closed, including when the close happens mid-wait.
    pub async fn send(&self, message: Message) -> Delivery {
        if self.closed.is_cancelled() {
            return Delivery::Closed;
        }
        tokio::select! {
            _ = self.closed.cancelled() => Delivery::Closed,
            permit = self.tx.reserve() => match permit {
                Ok(permit) => {
                    permit.send(message);
                    Delivery::Delivered
                }
                Err(_) => Delivery::Closed,
            },
        }
    }

    /// Signal the paired write loop to stop. Idempotent.
    pub fn close(&self) {
        if !self.closed.is_cancelled() {
            trace!("sink closed");
        }
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl SinkReceiver {
    /// Pop the next message in FIFO order.
    ///
    /// Yields `None` once the sink is closed; the close signal wins
    /// over any queued backlog, so a closed connection stops writing
    /// immediately instead of flushing stale messages.
    pub async fn recv(&mut self) -> Option<Message> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => None,
            message = self.rx.recv() => message,
        }
    }

    /// Close from the receiving side (e.g. after a transport write
    /// failure), so further router pushes become no-ops. Idempotent.
    pub fn close(&self) {
        self.closed.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Username;
    use std::time::Duration;

    fn msg(text: &str) -> Message {
        Message::now(Username::from("Alice"), text)
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (sink, mut receiver) = OutboundSink::channel(4);
        assert_eq!(sink.send(msg("one")).await, Delivery::Delivered);
        assert_eq!(sink.send(msg("two")).await, Delivery::Delivered);

        assert_eq!(receiver.recv().await.unwrap().content, "one");
        assert_eq!(receiver.recv().await.unwrap().content, "two");
    }

    #[tokio::test]
    async fn test_send_blocks_when_full() {
        let (sink, mut receiver) = OutboundSink::channel(1);
        assert_eq!(sink.send(msg("first")).await, Delivery::Delivered);

        // Queue is full: the second send must not complete yet.
        let pending = sink.send(msg("second"));
        tokio::pin!(pending);
        assert!(
            tokio::time::timeout(Duration::from_millis(50), &mut pending)
                .await
                .is_err(),
            "send on a full sink should block"
        );

        // Draining one message frees a slot and unblocks the sender.
        assert_eq!(receiver.recv().await.unwrap().content, "first");
        assert_eq!(pending.await, Delivery::Delivered);
        assert_eq!(receiver.recv().await.unwrap().content, "second");
    }

    #[tokio::test]
    async fn test_close_unblocks_waiting_sender() {
        let (sink, _receiver) = OutboundSink::channel(1);
        assert_eq!(sink.send(msg("fill")).await, Delivery::Delivered);

        let blocked = tokio::spawn({
            let sink = sink.clone();
            async move { sink.send(msg("stuck")).await }
        });

        tokio::task::yield_now().await;
        sink.close();

        let outcome = tokio::time::timeout(Duration::from_secs(1), blocked)
            .await
            .expect("close must unblock a waiting sender")
            .unwrap();
        assert_eq!(outcome, Delivery::Closed);
    }

    #[tokio::test]
    async fn test_send_after_close_is_noop() {
        let (sink, _receiver) = OutboundSink::channel(4);
        sink.close();
        assert_eq!(sink.send(msg("late")).await, Delivery::Closed);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (sink, mut receiver) = OutboundSink::channel(4);
        sink.close();
        sink.close();
        receiver.close();
        assert!(sink.is_closed());
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_receiver_stops_at_close_signal() {
        let (sink, mut receiver) = OutboundSink::channel(4);
        assert_eq!(sink.send(msg("queued")).await, Delivery::Delivered);
        sink.close();
        // Close wins over the backlog.
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_receiver_side_close_stops_sender() {
        let (sink, receiver) = OutboundSink::channel(4);
        receiver.close();
        assert_eq!(sink.send(msg("x")).await, Delivery::Closed);
    }
}
