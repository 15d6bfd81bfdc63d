//! Durable inserts that were started but have not landed yet.
//!
//! The ingest gateway returns once the broadcast succeeded and writes the
//! record in the background. Resolution waits here for those writes so a
//! status change is never aimed at a row that does not exist yet.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::join_all;
use tablecall_core::{Call, CallId, TableNumber};
use tokio::sync::watch;

#[derive(Debug)]
struct Entry {
    table: TableNumber,
    landed: watch::Receiver<bool>,
}

/// Registry shared by the ingest and resolution gateways of one process.
#[derive(Clone, Debug, Default)]
pub struct InFlightWrites {
    entries: Arc<Mutex<HashMap<CallId, Entry>>>,
}

impl InFlightWrites {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the write of `call`. Dropping the guard marks it landed,
    /// whether the insert succeeded or not.
    pub(crate) fn begin(&self, call: &Call) -> WriteGuard {
        let (landed_tx, landed_rx) = watch::channel(false);
        self.lock().insert(
            call.id.clone(),
            Entry { table: call.table_number.clone(), landed: landed_rx },
        );
        WriteGuard { writes: self.clone(), id: call.id.clone(), landed: landed_tx }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until no write for any of `ids` is in flight, or `limit` passed.
    pub(crate) async fn settle_ids(&self, ids: &[CallId], limit: Duration) {
        let pending: Vec<watch::Receiver<bool>> = {
            let entries = self.lock();
            ids.iter().filter_map(|id| entries.get(id)).map(|e| e.landed.clone()).collect()
        };
        Self::settle(pending, limit).await;
    }

    /// Wait until no write for `table` is in flight, or `limit` passed.
    pub(crate) async fn settle_table(&self, table: &TableNumber, limit: Duration) {
        let pending: Vec<watch::Receiver<bool>> = self
            .lock()
            .values()
            .filter(|e| &e.table == table)
            .map(|e| e.landed.clone())
            .collect();
        Self::settle(pending, limit).await;
    }

    async fn settle(pending: Vec<watch::Receiver<bool>>, limit: Duration) {
        if pending.is_empty() {
            return;
        }
        let count = pending.len();
        let waits = join_all(pending.into_iter().map(|mut rx| async move {
            rx.wait_for(|landed| *landed).await.is_ok()
        }));
        match tokio::time::timeout(limit, waits).await {
            Ok(_) => tracing::debug!(count, "in-flight durable writes landed"),
            Err(_) => tracing::warn!(count, ?limit, "in-flight durable writes still pending"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CallId, Entry>> {
        // Entries are independent, a panicked holder cannot leave them torn.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) struct WriteGuard {
    writes: InFlightWrites,
    id: CallId,
    landed: watch::Sender<bool>,
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        self.writes.lock().remove(&self.id);
        self.landed.send_replace(true);
    }
}
