//! Publisher for an external pub/sub relay reached over HTTP.
//!
//! Each publish is one `POST {url}/events` with body
//! `{"name": <event>, "channels": [<channel>], "data": "<json payload>"}`,
//! the payload encoded as a string the way hosted relays expect. Events are
//! also fanned out in-process so local views and the SSE stream see them.

use async_trait::async_trait;
use serde::Serialize;
use tablecall_core::{BroadcastEvent, RELAY_TIMEOUT_SECS};

use crate::local::LocalChannel;
use crate::{BroadcastChannel, ChannelError, Subscription};

#[derive(Serialize)]
struct RelayPublish<'a> {
    name: &'a str,
    channels: [&'a str; 1],
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cluster: Option<&'a str>,
}

pub struct RelayChannel {
    client: reqwest::Client,
    endpoint: String,
    key: String,
    cluster: Option<String>,
    local: LocalChannel,
}

impl std::fmt::Debug for RelayChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayChannel")
            .field("endpoint", &self.endpoint)
            .field("key", &"***")
            .field("cluster", &self.cluster)
            .field("channel", &self.local.name())
            .finish()
    }
}

impl RelayChannel {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend failure).
    pub fn new(
        name: &str,
        url: String,
        key: String,
        cluster: Option<String>,
    ) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(RELAY_TIMEOUT_SECS))
            .build()
            .map_err(|e| ChannelError::ClientInit(e.to_string()))?;
        let endpoint = format!("{}/events", url.trim_end_matches('/'));
        Ok(Self { client, endpoint, key, cluster, local: LocalChannel::new(name) })
    }

    fn payload(event: &BroadcastEvent) -> Result<String, ChannelError> {
        let data = match event {
            BroadcastEvent::NewCall(call) => serde_json::to_string(call)?,
            BroadcastEvent::StatusChanged(change) => serde_json::to_string(change)?,
        };
        Ok(data)
    }
}

#[async_trait]
impl BroadcastChannel for RelayChannel {
    fn name(&self) -> &str {
        self.local.name()
    }

    async fn publish(&self, event: &BroadcastEvent) -> Result<(), ChannelError> {
        self.local.fan_out(event);

        let body = RelayPublish {
            name: event.name(),
            channels: [self.local.name()],
            data: Self::payload(event)?,
            cluster: self.cluster.as_deref(),
        };
        let response =
            self.client.post(&self.endpoint).bearer_auth(&self.key).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                channel = %self.local.name(),
                event = event.name(),
                code = status.as_u16(),
                "relay rejected publish"
            );
            return Err(ChannelError::HttpStatus { code: status.as_u16(), body });
        }
        tracing::debug!(
            channel = %self.local.name(),
            event = event.name(),
            id = %event.call_id(),
            "relayed"
        );
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.local.subscribe()
    }
}
