//! Broadcast events read from a tablecall server's `GET /calls/events`
//! stream, for views running outside the server process.
//!
//! Publishing goes through the wrapped channel. Subscriptions are fed by one
//! background reader that reconnects whenever the stream drops.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tablecall_core::{BroadcastEvent, EVENT_STREAM_CONNECT_TIMEOUT_SECS, EVENT_STREAM_RETRY_SECS};
use tokio::task::JoinHandle;

use crate::local::LocalChannel;
use crate::{BroadcastChannel, ChannelError, Subscription};

pub struct ServerEventsChannel {
    publisher: Arc<dyn BroadcastChannel>,
    local: LocalChannel,
    url: String,
    reader: JoinHandle<()>,
}

impl std::fmt::Debug for ServerEventsChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerEventsChannel")
            .field("url", &self.url)
            .field("publisher", &self.publisher.name())
            .finish_non_exhaustive()
    }
}

impl ServerEventsChannel {
    /// Start reading `{server_url}/calls/events`. Must run inside a tokio
    /// runtime.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn connect(
        server_url: &str,
        publisher: Arc<dyn BroadcastChannel>,
    ) -> Result<Self, ChannelError> {
        // No overall timeout: the response body is an endless stream.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(EVENT_STREAM_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ChannelError::ClientInit(e.to_string()))?;
        let url = format!("{}/calls/events", server_url.trim_end_matches('/'));
        let local = LocalChannel::new(publisher.name());
        let reader = tokio::spawn(read_events(client, url.clone(), local.clone()));
        Ok(Self { publisher, local, url, reader })
    }
}

impl Drop for ServerEventsChannel {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl BroadcastChannel for ServerEventsChannel {
    fn name(&self) -> &str {
        self.local.name()
    }

    async fn publish(&self, event: &BroadcastEvent) -> Result<(), ChannelError> {
        self.publisher.publish(event).await?;
        self.local.fan_out(event);
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.local.subscribe()
    }
}

async fn read_events(client: reqwest::Client, url: String, local: LocalChannel) {
    let retry = Duration::from_secs(EVENT_STREAM_RETRY_SECS);
    loop {
        match stream_once(&client, &url, &local).await {
            Ok(()) => tracing::debug!(url = %url, "event stream ended, reconnecting"),
            Err(e) => tracing::warn!(url = %url, error = %e, "event stream failed, reconnecting"),
        }
        tokio::time::sleep(retry).await;
    }
}

async fn stream_once(
    client: &reqwest::Client,
    url: &str,
    local: &LocalChannel,
) -> Result<(), ChannelError> {
    let mut response =
        client.get(url).header(reqwest::header::ACCEPT, "text/event-stream").send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ChannelError::HttpStatus { code: status.as_u16(), body });
    }
    tracing::info!(url = %url, "event stream connected");

    let mut decoder = SseDecoder::default();
    while let Some(chunk) = response.chunk().await? {
        for data in decoder.push(&chunk) {
            match serde_json::from_str::<BroadcastEvent>(&data) {
                Ok(event) => {
                    let delivered = local.fan_out(&event);
                    tracing::trace!(
                        id = %event.call_id(),
                        event = event.name(),
                        delivered,
                        "streamed"
                    );
                },
                Err(e) => tracing::warn!(error = %e, "undecodable event on stream, skipped"),
            }
        }
    }
    Ok(())
}

/// Incremental `text/event-stream` decoder yielding the data of each event.
#[derive(Debug, Default)]
struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_owned());
            }
            // `event:`, `id:`, `retry:` and `:` keep-alive lines carry nothing needed.
        }
        events
    }
}
