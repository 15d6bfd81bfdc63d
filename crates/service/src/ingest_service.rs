use std::sync::Arc;

use chrono::Utc;
use tablecall_channel::BroadcastChannel;
use tablecall_core::{BroadcastEvent, Call, CallId, CallType, TableNumber};
use tablecall_storage::CallStore;

use crate::error::ServiceError;
use crate::in_flight::{InFlightWrites, WriteGuard};

/// A diner's request for service, as received from the outside.
#[derive(Debug, Clone, Default)]
pub struct CallRequest {
    pub table_number: String,
    /// Unrecognized or missing values fall back to `waiter`.
    pub call_type: Option<String>,
    /// Pre-minted id; retrying with the same id never creates a second call.
    pub id: Option<String>,
}

impl CallRequest {
    #[must_use]
    pub fn new(table_number: impl Into<String>, call_type: CallType) -> Self {
        Self {
            table_number: table_number.into(),
            call_type: Some(call_type.as_str().to_owned()),
            id: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: &CallId) -> Self {
        self.id = Some(id.to_string());
        self
    }
}

pub struct IngestService {
    store: Arc<dyn CallStore>,
    channel: Arc<dyn BroadcastChannel>,
    await_durable_write: bool,
    in_flight: InFlightWrites,
}

impl IngestService {
    #[must_use]
    pub fn new(store: Arc<dyn CallStore>, channel: Arc<dyn BroadcastChannel>) -> Self {
        Self { store, channel, await_durable_write: false, in_flight: InFlightWrites::new() }
    }

    /// Background inserts not yet landed. Hand this to the
    /// [`crate::ResolutionService`] of the same process.
    #[must_use]
    pub fn in_flight_writes(&self) -> InFlightWrites {
        self.in_flight.clone()
    }

    /// Await the durable write even when the broadcast already succeeded.
    #[must_use]
    pub const fn with_await_durable_write(mut self, await_durable_write: bool) -> Self {
        self.await_durable_write = await_durable_write;
        self
    }

    /// Admit a new call and propagate it to both transports under one id.
    ///
    /// Returns once the broadcast succeeded, or once the durable write did if
    /// the broadcast failed. Fails only when both failed.
    pub async fn create_call(&self, request: CallRequest) -> Result<Call, ServiceError> {
        let table_number = TableNumber::parse(&request.table_number)?;
        let id = match request.id.as_deref() {
            Some(raw) => CallId::parse(raw)?,
            None => CallId::generate(),
        };
        let call_type = CallType::from_lenient(request.call_type.as_deref());
        let call = Call::pending(id, table_number, call_type, Utc::now());
        // Registered before the broadcast so a resolution reacting to it
        // already sees the pending insert.
        let write = self.in_flight.begin(&call);

        match self.channel.publish(&BroadcastEvent::new_call(&call)).await {
            Ok(()) => {
                let call = if self.await_durable_write {
                    self.write_durable(call).await.unwrap_or_else(|(call, e)| {
                        tracing::warn!(
                            id = %call.id,
                            error = %e,
                            "durable write failed after broadcast"
                        );
                        call
                    })
                } else {
                    self.spawn_durable_write(call.clone(), write);
                    call
                };
                tracing::info!(
                    id = %call.id,
                    table = %call.table_number,
                    call_type = %call.call_type,
                    "call created"
                );
                Ok(call)
            },
            Err(broadcast_err) => {
                tracing::warn!(
                    id = %call.id,
                    error = %broadcast_err,
                    "broadcast publish failed, awaiting durable write"
                );
                match self.write_durable(call).await {
                    Ok(call) => {
                        tracing::info!(
                            id = %call.id,
                            table = %call.table_number,
                            "call created via durable store only"
                        );
                        Ok(call)
                    },
                    Err((call, store_err)) => {
                        tracing::error!(
                            id = %call.id,
                            broadcast = %broadcast_err,
                            store = %store_err,
                            "call lost: both transports failed"
                        );
                        Err(ServiceError::AllTransportsFailed {
                            broadcast: broadcast_err.to_string(),
                            store: store_err.to_string(),
                        })
                    },
                }
            },
        }
    }

    /// Failure is logged, not retried. The guard is released once the insert
    /// finished either way.
    fn spawn_durable_write(&self, call: Call, write: WriteGuard) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.insert_call(&call).await {
                tracing::warn!(id = %call.id, error = %e, "durable write failed after broadcast");
            }
            drop(write);
        });
    }

    /// Insert and return the stored record. An existing record with the same
    /// id wins, since it is the original of a retried request.
    async fn write_durable(&self, call: Call) -> Result<Call, (Call, ServiceError)> {
        match self.store.insert_call(&call).await {
            Ok(true) => Ok(call),
            Ok(false) => {
                tracing::debug!(id = %call.id, "call already stored, keeping original");
                match self.store.get_call(&call.id).await {
                    Ok(Some(existing)) => Ok(existing),
                    Ok(None) => Ok(call),
                    Err(e) => Err((call, e.into())),
                }
            },
            Err(e) => Err((call, e.into())),
        }
    }
}
