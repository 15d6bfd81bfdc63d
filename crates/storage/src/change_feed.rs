//! Receiving side of the durable store's change feed.

use tablecall_core::ChangeEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Live subscription to a store's transitions.
///
/// Dropping the feed unsubscribes.
pub struct ChangeFeed {
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeFeed {
    #[must_use]
    pub const fn new(rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { rx }
    }

    /// Next change, or `None` once the store has shut the feed down.
    ///
    /// A lagging subscriber skips the overwritten events; reconciliation
    /// repairs whatever was missed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "change feed subscriber lagged");
                },
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed").field("queued", &self.rx.len()).finish()
    }
}
