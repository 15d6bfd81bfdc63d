use tablecall_core::BroadcastEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Receiving end of a [`crate::BroadcastChannel`]. Dropping it unsubscribes.
pub struct Subscription {
    channel: String,
    rx: broadcast::Receiver<BroadcastEvent>,
}

impl Subscription {
    pub(crate) fn new(channel: &str, rx: broadcast::Receiver<BroadcastEvent>) -> Self {
        Self { channel: channel.to_owned(), rx }
    }

    /// Next event, or `None` once the channel is gone.
    ///
    /// Events overwritten while this subscriber lagged are skipped.
    pub async fn recv(&mut self) -> Option<BroadcastEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(channel = %self.channel, skipped, "broadcast subscriber lagged");
                },
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("queued", &self.rx.len())
            .finish()
    }
}
