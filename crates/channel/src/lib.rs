//! Ephemeral broadcast channel for tablecall
//!
//! Fast, unordered and non-persistent fan-out of [`BroadcastEvent`]s to
//! whoever is subscribed right now. Consumers must tolerate loss; the durable
//! store and periodic reconciliation cover the gaps.

mod error;
mod local;
mod relay;
mod server_events;
mod subscription;

use std::sync::Arc;

use async_trait::async_trait;
use tablecall_core::{BroadcastEvent, ChannelConfig};

pub use error::ChannelError;
pub use local::LocalChannel;
pub use relay::RelayChannel;
pub use server_events::ServerEventsChannel;
pub use subscription::Subscription;

/// Named pub/sub channel carrying call events.
#[async_trait]
pub trait BroadcastChannel: Send + Sync {
    /// Logical channel name.
    fn name(&self) -> &str;

    /// Publish one event. `Ok` means the transport accepted it, not that
    /// anyone received it.
    async fn publish(&self, event: &BroadcastEvent) -> Result<(), ChannelError>;

    /// Receive events published from now on.
    fn subscribe(&self) -> Subscription;
}

/// Build the configured channel.
pub fn from_config(
    config: &ChannelConfig,
    name: &str,
) -> Result<Arc<dyn BroadcastChannel>, ChannelError> {
    Ok(match config {
        ChannelConfig::Local => Arc::new(LocalChannel::new(name)),
        ChannelConfig::Relay { url, key, cluster } => Arc::new(RelayChannel::new(
            name,
            url.clone(),
            key.clone(),
            cluster.clone(),
        )?),
    })
}
