//! Broadcast fan-out: one inbound message to every sink but the
//! sender's.
//!
//! Backpressure policy: a push to a full sink waits until space frees
//! or the sink closes. Because routing runs on the single switchboard
//! task, one stalled recipient delays delivery to recipients later in
//! the fan-out order — a documented trade-off in exchange for trivially
//! serialized per-recipient ordering. A closed sink is skipped with a
//! log line, never an error.

use tracing::{debug, warn};

use crate::message::{Message, Username};
use crate::sink::{Delivery, OutboundSink};

#[derive(Debug, Default)]
pub struct Router;

impl Router {
    pub fn new() -> Self {
        Self
    }

    /// Deliver `message` to every sink in the snapshot except the
    /// sender's own.
    ///
    /// Delivery is attempted against whatever snapshot was taken; a
    /// recipient unregistered mid-flight is observed as a closed sink
    /// and skipped, not retried.
    pub async fn route(
        &self,
        snapshot: &[(Username, OutboundSink)],
        sender: &Username,
        message: &Message,
    ) {
        let mut delivered = 0usize;
        for (recipient, sink) in snapshot {
            if recipient == sender {
                continue;
            }
            match sink.send(message.clone()).await {
                Delivery::Delivered => delivered += 1,
                Delivery::Closed => {
                    warn!(recipient = %recipient, sender = %sender, "sink closed, skipping recipient");
                }
            }
        }
        debug!(sender = %sender, delivered, "message routed");
    }
}
