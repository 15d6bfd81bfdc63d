use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tablecall_channel::BroadcastChannel;
use tablecall_core::{
    BroadcastEvent, CallId, CallStatus, IN_FLIGHT_WRITE_WAIT_SECS, MAX_BATCH_IDS, TableNumber,
};
use tablecall_storage::{CallStore, StatusUpdate, StorageError};

use crate::error::ServiceError;
use crate::in_flight::InFlightWrites;

/// Parse a requested target status. Missing means `done`; only forward
/// targets are accepted.
pub fn parse_target_status(raw: Option<&str>) -> Result<CallStatus, ServiceError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(CallStatus::Done);
    };
    match raw.to_ascii_lowercase().parse::<CallStatus>() {
        Ok(CallStatus::Pending) => Err(ServiceError::InvalidInput(
            "status must be 'processing' or 'done'".to_owned(),
        )),
        Ok(status) => Ok(status),
        Err(_) => Err(ServiceError::InvalidInput(format!("unknown status '{raw}'"))),
    }
}

/// What a resolution request did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOutcome {
    /// Distinct ids targeted.
    pub requested: usize,
    /// Records the durable store moved forward.
    pub applied: usize,
    /// Ids the durable store does not know (batch requests only).
    pub unknown: usize,
}

impl ResolveOutcome {
    /// Calls now at (or past) the requested status.
    #[must_use]
    pub const fn resolved(&self) -> usize {
        self.requested.saturating_sub(self.unknown)
    }
}

pub struct ResolutionService {
    store: Arc<dyn CallStore>,
    channel: Arc<dyn BroadcastChannel>,
    in_flight: InFlightWrites,
    in_flight_wait: Duration,
}

impl ResolutionService {
    #[must_use]
    pub fn new(store: Arc<dyn CallStore>, channel: Arc<dyn BroadcastChannel>) -> Self {
        Self {
            store,
            channel,
            in_flight: InFlightWrites::new(),
            in_flight_wait: Duration::from_secs(IN_FLIGHT_WRITE_WAIT_SECS),
        }
    }

    /// Background inserts to wait for before writing a status.
    #[must_use]
    pub fn with_in_flight_writes(mut self, in_flight: InFlightWrites) -> Self {
        self.in_flight = in_flight;
        self
    }

    #[must_use]
    pub const fn with_in_flight_wait(mut self, wait: Duration) -> Self {
        self.in_flight_wait = wait;
        self
    }

    /// Move one call forward. An id the store does not know is `NotFound`.
    pub async fn resolve_one(
        &self,
        id: &CallId,
        status: CallStatus,
    ) -> Result<ResolveOutcome, ServiceError> {
        let outcome = self.resolve_ids(std::slice::from_ref(id), status).await?;
        if outcome.unknown > 0 {
            return Err(ServiceError::NotFound(format!("call {id}")));
        }
        Ok(outcome)
    }

    /// Move a batch of calls forward. Unknown ids are skipped.
    pub async fn resolve_ids(
        &self,
        ids: &[CallId],
        status: CallStatus,
    ) -> Result<ResolveOutcome, ServiceError> {
        if ids.is_empty() {
            return Err(ServiceError::InvalidInput("no call ids given".to_owned()));
        }
        if ids.len() > MAX_BATCH_IDS {
            return Err(ServiceError::InvalidInput(format!(
                "at most {MAX_BATCH_IDS} ids per request, got {}",
                ids.len()
            )));
        }
        if status == CallStatus::Pending {
            return Err(ServiceError::InvalidInput(
                "status must be 'processing' or 'done'".to_owned(),
            ));
        }
        let mut seen = HashSet::new();
        let unique: Vec<CallId> = ids.iter().filter(|id| seen.insert(*id)).cloned().collect();
        self.propagate(&unique, status).await
    }

    /// Move every currently active call of a table forward in one action.
    pub async fn resolve_table(
        &self,
        table: &TableNumber,
        status: CallStatus,
    ) -> Result<ResolveOutcome, ServiceError> {
        if status == CallStatus::Pending {
            return Err(ServiceError::InvalidInput(
                "status must be 'processing' or 'done'".to_owned(),
            ));
        }
        self.in_flight.settle_table(table, self.in_flight_wait).await;
        let active = self.store.active_calls_for_table(table).await?;
        let ids: Vec<CallId> =
            active.into_iter().filter(|c| c.status < status).map(|c| c.id).collect();
        if ids.is_empty() {
            tracing::debug!(table = %table, "no active calls to resolve");
            return Ok(ResolveOutcome::default());
        }
        tracing::info!(table = %table, count = ids.len(), status = %status, "resolving table");
        self.propagate(&ids, status).await
    }

    /// Broadcast first, then the forward-only durable write.
    async fn propagate(
        &self,
        ids: &[CallId],
        status: CallStatus,
    ) -> Result<ResolveOutcome, ServiceError> {
        let broadcasts = join_all(ids.iter().map(|id| {
            let event = BroadcastEvent::status_changed(id.clone(), status);
            async move { self.channel.publish(&event).await }
        }))
        .await;
        let broadcast_err = broadcasts.into_iter().find_map(Result::err);
        if let Some(e) = &broadcast_err {
            tracing::warn!(error = %e, status = %status, "status broadcast failed");
        }

        self.in_flight.settle_ids(ids, self.in_flight_wait).await;
        let writes = join_all(ids.iter().map(|id| self.store.advance_status(id, status))).await;

        let mut outcome = ResolveOutcome { requested: ids.len(), ..ResolveOutcome::default() };
        let mut store_err: Option<StorageError> = None;
        for (id, write) in ids.iter().zip(writes) {
            match write {
                Ok(StatusUpdate::Applied(_)) => outcome.applied += 1,
                Ok(StatusUpdate::Unchanged(call)) => {
                    tracing::debug!(
                        id = %id,
                        current = %call.status,
                        "already at or past target status"
                    );
                },
                Err(e) if e.is_not_found() => {
                    tracing::debug!(id = %id, "resolve for unknown call ignored");
                    outcome.unknown += 1;
                },
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "durable status write failed");
                    store_err.get_or_insert(e);
                },
            }
        }

        if let (Some(broadcast), Some(store)) = (broadcast_err, store_err) {
            return Err(ServiceError::AllTransportsFailed {
                broadcast: broadcast.to_string(),
                store: store.to_string(),
            });
        }
        tracing::info!(
            requested = outcome.requested,
            applied = outcome.applied,
            unknown = outcome.unknown,
            status = %status,
            "calls resolved"
        );
        Ok(outcome)
    }
}
