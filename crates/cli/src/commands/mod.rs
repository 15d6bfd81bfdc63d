pub(crate) mod active;
pub(crate) mod resolve;
pub(crate) mod serve;
pub(crate) mod watch;

use std::sync::Arc;

use anyhow::Result;
use tablecall_channel::BroadcastChannel;
use tablecall_core::AppConfig;
use tablecall_storage::StorageBackend;

/// Both transports built from the environment.
pub(crate) struct Transports {
    pub config: AppConfig,
    pub store: Arc<StorageBackend>,
    pub channel: Arc<dyn BroadcastChannel>,
}

pub(crate) async fn connect() -> Result<Transports> {
    let config = AppConfig::from_env()?;
    let store = Arc::new(StorageBackend::from_config(&config.store).await?);
    let channel = tablecall_channel::from_config(&config.channel, &config.channel_name)?;
    tracing::debug!(store = store.kind(), channel = channel.name(), "transports ready");
    Ok(Transports { config, store, channel })
}
