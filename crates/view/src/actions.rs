//! What views need from the outside world.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tablecall_channel::BroadcastChannel;
use tablecall_core::{Call, CallId, CallStatus};
use tablecall_service::{CallRequest, IngestService, ResolutionService, ServiceError};
use tablecall_storage::CallStore;

/// Transports a view reads from.
#[derive(Clone)]
pub struct ViewSources {
    pub store: Arc<dyn CallStore>,
    pub channel: Arc<dyn BroadcastChannel>,
    /// Reconciliation period.
    pub poll_interval: Duration,
}

impl std::fmt::Debug for ViewSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewSources")
            .field("channel", &self.channel.name())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

/// Staff-side action: move calls forward.
#[async_trait]
pub trait CallResolver: Send + Sync {
    /// Returns how many calls are now at or past `status`.
    async fn resolve_calls(&self, ids: &[CallId], status: CallStatus)
    -> Result<usize, ServiceError>;
}

/// Diner-side action: ask for service.
#[async_trait]
pub trait CallSubmitter: Send + Sync {
    async fn submit_call(&self, request: CallRequest) -> Result<Call, ServiceError>;
}

#[async_trait]
impl CallResolver for ResolutionService {
    async fn resolve_calls(
        &self,
        ids: &[CallId],
        status: CallStatus,
    ) -> Result<usize, ServiceError> {
        Ok(self.resolve_ids(ids, status).await?.resolved())
    }
}

#[async_trait]
impl CallSubmitter for IngestService {
    async fn submit_call(&self, request: CallRequest) -> Result<Call, ServiceError> {
        self.create_call(request).await
    }
}
