//! In-process broadcast channel.

use async_trait::async_trait;
use tablecall_core::{BROADCAST_CAPACITY, BroadcastEvent};
use tokio::sync::broadcast;

use crate::{BroadcastChannel, ChannelError, Subscription};

/// Fan-out to subscribers inside this process; remote clients receive the
/// same events over the HTTP event stream.
#[derive(Clone, Debug)]
pub struct LocalChannel {
    name: String,
    tx: broadcast::Sender<BroadcastEvent>,
}

impl LocalChannel {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let (tx, _initial_rx) = broadcast::channel(BROADCAST_CAPACITY);
        Self { name: name.to_owned(), tx }
    }

    /// Deliver to local subscribers. Returns how many received it.
    pub(crate) fn fan_out(&self, event: &BroadcastEvent) -> usize {
        self.tx.send(event.clone()).unwrap_or(0)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl BroadcastChannel for LocalChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, event: &BroadcastEvent) -> Result<(), ChannelError> {
        let delivered = self.fan_out(event);
        tracing::debug!(
            channel = %self.name,
            event = event.name(),
            id = %event.call_id(),
            delivered,
            "published"
        );
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(&self.name, self.tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tablecall_core::{Call, CallStatus, CallType};

    fn sample_call() -> Call {
        Call::pending("l-1".into(), "3".into(), CallType::Waiter, Utc::now())
    }

    #[tokio::test]
    async fn publish_without_subscribers_succeeds() {
        let channel = LocalChannel::new("service-calls");
        channel.publish(&BroadcastEvent::new_call(&sample_call())).await.unwrap();
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn every_subscriber_receives_each_event() {
        let channel = LocalChannel::new("service-calls");
        let mut first = channel.subscribe();
        let mut second = channel.subscribe();

        let event = BroadcastEvent::status_changed("l-1".into(), CallStatus::Done);
        channel.publish(&event).await.unwrap();

        assert_eq!(first.recv().await, Some(event.clone()));
        assert_eq!(second.recv().await, Some(event));
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let channel = LocalChannel::new("service-calls");
        channel.publish(&BroadcastEvent::new_call(&sample_call())).await.unwrap();

        let mut late = channel.subscribe();
        let next = tokio::time::timeout(std::time::Duration::from_millis(20), late.recv()).await;
        assert!(next.is_err());
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_overwritten_events() {
        let channel = LocalChannel::new("service-calls");
        let mut sub = channel.subscribe();
        for i in 0..(BROADCAST_CAPACITY + 4) {
            let event = BroadcastEvent::status_changed(format!("c-{i}").into(), CallStatus::Done);
            channel.publish(&event).await.unwrap();
        }
        let first_seen = sub.recv().await.unwrap();
        assert_eq!(first_seen.call_id().as_str(), "c-4");
    }

    #[tokio::test]
    async fn subscription_ends_when_channel_dropped() {
        let channel = LocalChannel::new("service-calls");
        let mut sub = channel.subscribe();
        drop(channel);
        assert!(sub.recv().await.is_none());
    }
}
